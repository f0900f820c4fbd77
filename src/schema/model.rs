use {
    indexmap::IndexMap,
    std::{
        fmt::{Display, Formatter},
        sync::Arc,
    },
};

/// The eight argument kinds of the wire format.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum ArgKind {
    Int,
    Uint,
    Fixed,
    String,
    Object,
    NewId,
    Array,
    Fd,
}

impl ArgKind {
    pub fn from_name(name: &str) -> Option<Self> {
        let kind = match name {
            "int" => Self::Int,
            "uint" => Self::Uint,
            "fixed" => Self::Fixed,
            "string" => Self::String,
            "object" => Self::Object,
            "new_id" => Self::NewId,
            "array" => Self::Array,
            "fd" => Self::Fd,
            _ => return None,
        };
        Some(kind)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Int => "int",
            Self::Uint => "uint",
            Self::Fixed => "fixed",
            Self::String => "string",
            Self::Object => "object",
            Self::NewId => "new_id",
            Self::Array => "array",
            Self::Fd => "fd",
        }
    }
}

impl Display for ArgKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Description {
    pub summary: Option<String>,
    pub body: String,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Arg {
    pub name: String,
    /// `name`, renamed if it collides with a reserved identifier.
    pub safe_name: String,
    pub kind: ArgKind,
    pub interface: Option<String>,
    pub allow_null: bool,
    pub summary: Option<String>,
    pub description: Option<Description>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Direction {
    Request,
    Event,
}

impl Direction {
    pub fn name(self) -> &'static str {
        match self {
            Direction::Request => "request",
            Direction::Event => "event",
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Message {
    pub name: String,
    pub safe_name: String,
    pub camel_name: String,
    pub direction: Direction,
    /// The position of the message among the messages of the same direction in the
    /// document. This is the opcode on the wire.
    pub opcode: u16,
    pub since: Option<u32>,
    pub destructor: bool,
    pub description: Option<Description>,
    pub args: Vec<Arg>,
}

impl Message {
    /// The number of file descriptors a message of this type carries in the side channel.
    pub fn fd_count(&self) -> usize {
        self.args.iter().filter(|a| a.kind == ArgKind::Fd).count()
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Entry {
    /// The identifier used for this entry. Equal to `raw_name` unless the enum has entries
    /// starting with a digit.
    pub name: String,
    pub raw_name: String,
    pub value: u32,
    pub summary: Option<String>,
    pub since: Option<u32>,
    pub description: Option<Description>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Enum {
    pub name: String,
    pub bitfield: bool,
    pub since: Option<u32>,
    pub description: Option<Description>,
    pub entries: Vec<Entry>,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Interface {
    pub name: String,
    pub camel_name: String,
    pub protocol: String,
    pub version: u32,
    pub description: Option<Description>,
    /// Sorted by name.
    pub requests: Vec<Message>,
    /// Sorted by name.
    pub events: Vec<Message>,
    /// Sorted by name.
    pub enums: Vec<Enum>,
    pub global_singleton: Option<u32>,
    pub(super) request_index: Vec<usize>,
    pub(super) event_index: Vec<usize>,
}

impl Interface {
    pub fn request(&self, opcode: u16) -> Option<&Message> {
        let idx = *self.request_index.get(opcode as usize)?;
        Some(&self.requests[idx])
    }

    pub fn event(&self, opcode: u16) -> Option<&Message> {
        let idx = *self.event_index.get(opcode as usize)?;
        Some(&self.events[idx])
    }

    pub fn request_by_name(&self, name: &str) -> Option<&Message> {
        self.requests.iter().find(|m| m.name == name)
    }

    pub fn event_by_name(&self, name: &str) -> Option<&Message> {
        self.events.iter().find(|m| m.name == name)
    }

    pub fn num_requests(&self) -> usize {
        self.requests.len()
    }

    /// The requests in opcode order.
    pub fn requests_by_opcode(&self) -> impl Iterator<Item = &Message> + '_ {
        self.request_index.iter().map(|&i| &self.requests[i])
    }

    /// The events in opcode order.
    pub fn events_by_opcode(&self) -> impl Iterator<Item = &Message> + '_ {
        self.event_index.iter().map(|&i| &self.events[i])
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Protocol {
    pub name: String,
    pub copyright: Option<String>,
    pub description: Option<Description>,
    /// In document order, without excluded interfaces.
    pub interfaces: Vec<Arc<Interface>>,
}

/// All protocols of one run, with interfaces indexed by name.
#[derive(Clone, Debug, Default)]
pub struct Schema {
    pub(super) protocols: Vec<Protocol>,
    pub(super) interfaces: IndexMap<String, Arc<Interface>>,
}

impl Schema {
    pub fn protocols(&self) -> &[Protocol] {
        &self.protocols
    }

    pub fn interface(&self, name: &str) -> Option<&Arc<Interface>> {
        self.interfaces.get(name)
    }

    pub fn interfaces(&self) -> impl Iterator<Item = &Arc<Interface>> + '_ {
        self.interfaces.values()
    }
}
