use {
    crate::{
        config::GeneratorConfig,
        schema::{
            model::{
                Arg, ArgKind, Description, Direction, Entry, Enum, Interface, Message, Protocol,
                Schema,
            },
            names::{safe_name, to_camel},
        },
    },
    indexmap::IndexMap,
    std::{num::ParseIntError, str::FromStr, sync::Arc},
    thiserror::Error,
    xml_to_wire::Element,
};

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("Could not build protocol {0}")]
    Protocol(String, #[source] Box<SchemaError>),
    #[error("Could not build interface {0}")]
    Interface(String, #[source] Box<SchemaError>),
    #[error("The root element is `{0}` instead of `protocol`")]
    NotAProtocol(String),
    #[error("`{element}` element has no `{attribute}` attribute")]
    MissingAttribute {
        element: String,
        attribute: &'static str,
    },
    #[error("Protocol {0} has more than one copyright")]
    DuplicateCopyright(String),
    #[error("{0} has more than one description")]
    DuplicateDescription(String),
    #[error("Unexpected element `{child}` in {parent}")]
    UnknownElement { parent: String, child: String },
    #[error("Entry `{entry}` of enum `{enum_}` does not start with a lowercase letter or digit")]
    InvalidEntryName { enum_: String, entry: String },
    #[error("Could not parse the `{attribute}` attribute of {owner}")]
    InvalidNumber {
        owner: String,
        attribute: &'static str,
        #[source]
        source: ParseIntError,
    },
    #[error("Could not parse the `{attribute}` attribute of {owner}: `{value}` is not a boolean")]
    InvalidBool {
        owner: String,
        attribute: &'static str,
        value: String,
    },
    #[error("Argument `{arg}` of {owner} has unknown type `{ty}`")]
    UnknownArgType {
        owner: String,
        arg: String,
        ty: String,
    },
    #[error("{owner} has unknown type `{ty}`")]
    UnknownMessageType { owner: String, ty: String },
    #[error("There is more than one {direction} named `{name}`")]
    DuplicateMessage {
        direction: &'static str,
        name: String,
    },
    #[error("There is more than one enum named `{0}`")]
    DuplicateEnum(String),
    #[error("There are more than 65536 {0}s")]
    TooManyMessages(&'static str),
    #[error("Interface {0} is defined by more than one protocol")]
    DuplicateInterface(String),
}

impl Schema {
    /// Builds every protocol document of one run.
    pub fn build(trees: &[Element], config: &GeneratorConfig) -> Result<Self, SchemaError> {
        let mut protocols = vec![];
        let mut interfaces = IndexMap::new();
        for tree in trees {
            let protocol = build(tree, config)?;
            for interface in &protocol.interfaces {
                if interfaces
                    .insert(interface.name.clone(), interface.clone())
                    .is_some()
                {
                    return Err(SchemaError::DuplicateInterface(interface.name.clone()));
                }
            }
            protocols.push(protocol);
        }
        Ok(Self {
            protocols,
            interfaces,
        })
    }
}

/// Builds the schema of a single `<protocol>` element.
pub fn build(tree: &Element, config: &GeneratorConfig) -> Result<Protocol, SchemaError> {
    if tree.name != "protocol" {
        return Err(SchemaError::NotAProtocol(tree.name.clone()));
    }
    let name = required(tree, "name")?;
    build_protocol(name, tree, config)
        .map_err(|e| SchemaError::Protocol(name.to_string(), Box::new(e)))
}

fn required<'a>(elem: &'a Element, attribute: &'static str) -> Result<&'a str, SchemaError> {
    elem.attr(attribute).ok_or_else(|| SchemaError::MissingAttribute {
        element: elem.name.clone(),
        attribute,
    })
}

fn number<T: FromStr<Err = ParseIntError>>(
    elem: &Element,
    attribute: &'static str,
    owner: &str,
) -> Result<Option<T>, SchemaError> {
    let Some(value) = elem.attr(attribute) else {
        return Ok(None);
    };
    match value.parse() {
        Ok(v) => Ok(Some(v)),
        Err(source) => Err(SchemaError::InvalidNumber {
            owner: owner.to_string(),
            attribute,
            source,
        }),
    }
}

fn boolean(elem: &Element, attribute: &'static str, owner: &str) -> Result<bool, SchemaError> {
    match elem.attr(attribute) {
        None | Some("false") => Ok(false),
        Some("true") => Ok(true),
        Some(value) => Err(SchemaError::InvalidBool {
            owner: owner.to_string(),
            attribute,
            value: value.to_string(),
        }),
    }
}

fn unknown_element(parent: &str, child: &Element) -> SchemaError {
    SchemaError::UnknownElement {
        parent: parent.to_string(),
        child: child.name.clone(),
    }
}

fn set_description(
    slot: &mut Option<Description>,
    elem: &Element,
    owner: &str,
) -> Result<(), SchemaError> {
    if slot.is_some() {
        return Err(SchemaError::DuplicateDescription(owner.to_string()));
    }
    if let Some(child) = elem.children.first() {
        return Err(unknown_element(&format!("the description of {owner}"), child));
    }
    *slot = Some(Description {
        summary: elem.attr("summary").map(|s| s.to_string()),
        body: elem.text.clone(),
    });
    Ok(())
}

fn build_protocol(
    name: &str,
    tree: &Element,
    config: &GeneratorConfig,
) -> Result<Protocol, SchemaError> {
    let owner = format!("protocol {name}");
    let mut copyright = None;
    let mut description = None;
    let mut interfaces = vec![];
    for child in &tree.children {
        match child.name.as_str() {
            "copyright" => {
                if copyright.is_some() {
                    return Err(SchemaError::DuplicateCopyright(name.to_string()));
                }
                if let Some(c) = child.children.first() {
                    return Err(unknown_element("copyright", c));
                }
                copyright = Some(child.text.clone());
            }
            "description" => set_description(&mut description, child, &owner)?,
            "interface" => {
                let iname = required(child, "name")?;
                if config.is_excluded(name, iname) {
                    log::debug!("Skipping excluded interface {}/{}", name, iname);
                    continue;
                }
                let interface = build_interface(name, iname, child, config)
                    .map_err(|e| SchemaError::Interface(iname.to_string(), Box::new(e)))?;
                interfaces.push(Arc::new(interface));
            }
            _ => return Err(unknown_element(&owner, child)),
        }
    }
    Ok(Protocol {
        name: name.to_string(),
        copyright,
        description,
        interfaces,
    })
}

fn build_interface(
    protocol: &str,
    name: &str,
    elem: &Element,
    config: &GeneratorConfig,
) -> Result<Interface, SchemaError> {
    let owner = format!("interface {name}");
    let version = number(elem, "version", &owner)?.ok_or(SchemaError::MissingAttribute {
        element: elem.name.clone(),
        attribute: "version",
    })?;
    let mut description = None;
    let mut requests = vec![];
    let mut events = vec![];
    let mut enums = vec![];
    for child in &elem.children {
        match child.name.as_str() {
            "description" => set_description(&mut description, child, &owner)?,
            "request" => {
                let opcode = requests.len();
                requests.push(build_message(name, child, Direction::Request, opcode)?);
            }
            "event" => {
                let opcode = events.len();
                events.push(build_message(name, child, Direction::Event, opcode)?);
            }
            "enum" => enums.push(build_enum(name, child)?),
            _ => return Err(unknown_element(&owner, child)),
        }
    }
    let request_index = sort_messages(&mut requests, Direction::Request)?;
    let event_index = sort_messages(&mut events, Direction::Event)?;
    enums.sort_by(|l, r| l.name.cmp(&r.name));
    if let Some(w) = enums.windows(2).find(|w| w[0].name == w[1].name) {
        return Err(SchemaError::DuplicateEnum(w[0].name.clone()));
    }
    Ok(Interface {
        name: name.to_string(),
        camel_name: to_camel(name),
        protocol: protocol.to_string(),
        version,
        description,
        requests,
        events,
        enums,
        global_singleton: config.global_singleton(protocol, name),
        request_index,
        event_index,
    })
}

/// Sorts messages by name and returns the position of every opcode in the sorted list.
fn sort_messages(
    messages: &mut [Message],
    direction: Direction,
) -> Result<Vec<usize>, SchemaError> {
    messages.sort_by(|l, r| l.name.cmp(&r.name));
    if let Some(w) = messages.windows(2).find(|w| w[0].name == w[1].name) {
        return Err(SchemaError::DuplicateMessage {
            direction: direction.name(),
            name: w[0].name.clone(),
        });
    }
    let mut index = vec![0; messages.len()];
    for (pos, message) in messages.iter().enumerate() {
        index[message.opcode as usize] = pos;
    }
    Ok(index)
}

fn build_message(
    interface: &str,
    elem: &Element,
    direction: Direction,
    opcode: usize,
) -> Result<Message, SchemaError> {
    let name = required(elem, "name")?;
    let owner = format!("{} {interface}.{name}", direction.name());
    let Ok(opcode) = u16::try_from(opcode) else {
        return Err(SchemaError::TooManyMessages(direction.name()));
    };
    let destructor = match elem.attr("type") {
        None => false,
        Some("destructor") => true,
        Some(ty) => {
            return Err(SchemaError::UnknownMessageType {
                owner,
                ty: ty.to_string(),
            });
        }
    };
    let since = number(elem, "since", &owner)?;
    let mut description = None;
    let mut args = vec![];
    for child in &elem.children {
        match child.name.as_str() {
            "description" => set_description(&mut description, child, &owner)?,
            "arg" => args.push(build_arg(&owner, child)?),
            _ => return Err(unknown_element(&owner, child)),
        }
    }
    Ok(Message {
        name: name.to_string(),
        safe_name: safe_name(name).into_owned(),
        camel_name: to_camel(name),
        direction,
        opcode,
        since,
        destructor,
        description,
        args,
    })
}

fn build_arg(message: &str, elem: &Element) -> Result<Arg, SchemaError> {
    let name = required(elem, "name")?;
    let ty = required(elem, "type")?;
    let owner = format!("argument {name} of {message}");
    let Some(kind) = ArgKind::from_name(ty) else {
        return Err(SchemaError::UnknownArgType {
            owner: message.to_string(),
            arg: name.to_string(),
            ty: ty.to_string(),
        });
    };
    let mut description = None;
    for child in &elem.children {
        match child.name.as_str() {
            "description" => set_description(&mut description, child, &owner)?,
            _ => return Err(unknown_element(&owner, child)),
        }
    }
    Ok(Arg {
        name: name.to_string(),
        safe_name: safe_name(name).into_owned(),
        kind,
        interface: elem.attr("interface").map(|s| s.to_string()),
        allow_null: boolean(elem, "allow-null", &owner)?,
        summary: elem.attr("summary").map(|s| s.to_string()),
        description,
    })
}

fn build_enum(interface: &str, elem: &Element) -> Result<Enum, SchemaError> {
    let name = required(elem, "name")?;
    let owner = format!("enum {interface}.{name}");
    let since = number(elem, "since", &owner)?;
    let bitfield = boolean(elem, "bitfield", &owner)?;
    let mut description = None;
    let mut entries = vec![];
    for child in &elem.children {
        match child.name.as_str() {
            "description" => set_description(&mut description, child, &owner)?,
            "entry" => entries.push(build_entry(&owner, child)?),
            _ => return Err(unknown_element(&owner, child)),
        }
    }
    assign_entry_names(name, &mut entries)?;
    Ok(Enum {
        name: name.to_string(),
        bitfield,
        since,
        description,
        entries,
    })
}

/// Entry names must start with a lowercase letter. If any of them starts with a digit
/// instead, every entry of the enum is prefixed with the enum name.
fn assign_entry_names(enum_: &str, entries: &mut [Entry]) -> Result<(), SchemaError> {
    let mut needs_prefix = false;
    for entry in entries.iter() {
        match entry.raw_name.as_bytes().first() {
            Some(b'a'..=b'z') => {}
            Some(b'0'..=b'9') => needs_prefix = true,
            _ => {
                return Err(SchemaError::InvalidEntryName {
                    enum_: enum_.to_string(),
                    entry: entry.raw_name.clone(),
                });
            }
        }
    }
    if needs_prefix {
        for entry in entries {
            entry.name = format!("{}_{}", enum_, entry.raw_name);
        }
    }
    Ok(())
}

fn build_entry(enum_: &str, elem: &Element) -> Result<Entry, SchemaError> {
    let name = required(elem, "name")?;
    let value = required(elem, "value")?;
    let owner = format!("entry {name} of {enum_}");
    let value = match value.strip_prefix("0x") {
        Some(hex) => u32::from_str_radix(hex, 16),
        None => value.parse(),
    };
    let value = value.map_err(|source| SchemaError::InvalidNumber {
        owner: owner.clone(),
        attribute: "value",
        source,
    })?;
    let mut description = None;
    for child in &elem.children {
        match child.name.as_str() {
            "description" => set_description(&mut description, child, &owner)?,
            _ => return Err(unknown_element(&owner, child)),
        }
    }
    Ok(Entry {
        name: name.to_string(),
        raw_name: name.to_string(),
        value,
        summary: elem.attr("summary").map(|s| s.to_string()),
        since: number(elem, "since", &owner)?,
        description,
    })
}
