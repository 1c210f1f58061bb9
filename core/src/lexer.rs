//! Field-record tokenizer for `lsof -F` output.
//!
//! `lsof -F` prints one field per line: the first character names the field
//! and the rest of the line is its value. A `p` line opens a process block and
//! an `f` line opens a socket block inside it. This module is the only place
//! that knows the tag characters; everything downstream works on
//! [`FieldTag`].

/// Field identifier carried by the first character of a listing line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldTag {
    /// `p`: process id, opens a process block.
    Pid,
    /// `c`: short command name.
    Command,
    /// `L`: login name of the process owner.
    User,
    /// `f`: file descriptor, opens a socket block.
    FileDescriptor,
    /// `P`: protocol name.
    Protocol,
    /// `n`: address spec (`local` or `local->remote`).
    Name,
    /// `T`: TCP/TPI info (`ST=LISTEN`, `QR=0`, ...).
    TcpInfo,
    /// Any tag this parser does not consume.
    Unknown(char),
}

impl FieldTag {
    pub fn from_char(c: char) -> Self {
        match c {
            'p' => Self::Pid,
            'c' => Self::Command,
            'L' => Self::User,
            'f' => Self::FileDescriptor,
            'P' => Self::Protocol,
            'n' => Self::Name,
            'T' => Self::TcpInfo,
            other => Self::Unknown(other),
        }
    }
}

/// One tagged line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field<'a> {
    pub tag: FieldTag,
    pub value: &'a str,
    /// 1-based line number in the listing.
    pub line: usize,
}

/// Lines belonging to one socket, starting after its `f` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SocketBlock<'a> {
    pub descriptor: &'a str,
    pub line: usize,
    pub fields: Vec<Field<'a>>,
}

/// Lines belonging to one process: the header (starting with its `p` line)
/// and the socket blocks that follow it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessBlock<'a> {
    pub line: usize,
    pub header: Vec<Field<'a>>,
    pub sockets: Vec<SocketBlock<'a>>,
}

impl<'a> ProcessBlock<'a> {
    /// Value of the first header field with the given tag.
    pub fn header_value(&self, tag: FieldTag) -> Option<&'a str> {
        self.header.iter().find(|f| f.tag == tag).map(|f| f.value)
    }
}

/// Listing split into process blocks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Blocks<'a> {
    pub processes: Vec<ProcessBlock<'a>>,
    /// Fields that appeared before the first process header.
    pub stray: Vec<Field<'a>>,
}

/// Splits raw text into tagged fields, skipping empty lines.
pub fn tokenize(text: &str) -> Vec<Field<'_>> {
    text.lines()
        .enumerate()
        .filter_map(|(idx, raw)| {
            let line = raw.strip_suffix('\r').unwrap_or(raw);
            let mut chars = line.chars();
            let tag = FieldTag::from_char(chars.next()?);
            Some(Field {
                tag,
                value: chars.as_str(),
                line: idx + 1,
            })
        })
        .collect()
}

/// Groups fields into process blocks and their socket sub-blocks.
///
/// # Examples
///
/// ```
/// use portscope_core::lexer::{FieldTag, split_blocks};
///
/// let blocks = split_blocks("p10\ncnginx\nLroot\nf6\nPTCP\nn*:80\n");
/// assert_eq!(blocks.processes.len(), 1);
/// let proc = &blocks.processes[0];
/// assert_eq!(proc.header_value(FieldTag::Command), Some("nginx"));
/// assert_eq!(proc.sockets[0].descriptor, "6");
/// assert_eq!(proc.sockets[0].fields.len(), 2);
/// ```
pub fn split_blocks(text: &str) -> Blocks<'_> {
    let mut blocks = Blocks::default();

    for field in tokenize(text) {
        match field.tag {
            FieldTag::Pid => blocks.processes.push(ProcessBlock {
                line: field.line,
                header: vec![field],
                sockets: Vec::new(),
            }),
            FieldTag::FileDescriptor => match blocks.processes.last_mut() {
                Some(proc) => open_socket(&mut proc.sockets, field),
                None => blocks.stray.push(field),
            },
            _ => match blocks.processes.last_mut() {
                Some(proc) => match proc.sockets.last_mut() {
                    Some(socket) => socket.fields.push(field),
                    None => proc.header.push(field),
                },
                None => blocks.stray.push(field),
            },
        }
    }

    blocks
}

/// Handles an `f` line.
///
/// A numeric descriptor opens a new socket block. When the text after `f`
/// starts with a socket tag (`P`, `n`, `T`) the `f` is only a marker and the
/// rest is that socket's first field. Consecutive marker lines with distinct
/// tags describe the same socket.
fn open_socket<'a>(sockets: &mut Vec<SocketBlock<'a>>, field: Field<'a>) {
    let Some(inline) = inline_socket_field(field) else {
        sockets.push(SocketBlock {
            descriptor: field.value,
            line: field.line,
            fields: Vec::new(),
        });
        return;
    };

    if let Some(socket) = sockets.last_mut().filter(|socket| {
        socket.descriptor.is_empty() && !socket.fields.iter().any(|f| f.tag == inline.tag)
    }) {
        socket.fields.push(inline);
    } else {
        sockets.push(SocketBlock {
            descriptor: "",
            line: field.line,
            fields: vec![inline],
        });
    }
}

fn inline_socket_field(field: Field<'_>) -> Option<Field<'_>> {
    let mut chars = field.value.chars();
    let tag = FieldTag::from_char(chars.next()?);
    match tag {
        FieldTag::Protocol | FieldTag::Name | FieldTag::TcpInfo => Some(Field {
            tag,
            value: chars.as_str(),
            line: field.line,
        }),
        _ => None,
    }
}
