//! Renders the schema as Rust source for host projects.
//!
//! Every interface becomes one module containing its constants, one struct per message,
//! a handler trait with a stub per request, and a `dispatch` function that decodes a
//! request and calls the handler. The root `resource` module tags resources with their
//! interface and routes requests to the module of that interface.


use {
    crate::{
        dispatch::{HostRole, NextAction},
        schema::{Arg, ArgKind, Enum, Interface, Message, Protocol, Schema, safe_name, to_upper},
    },
    std::{
        fmt::Write,
        io,
        path::{Path, PathBuf},
    },
    thiserror::Error,
};

const HEADER: &str = "// This file is generated by wire-relay. Do not edit.";

#[derive(Debug, Error)]
pub enum EmitError {
    #[error("Could not format the output")]
    Format(#[from] std::fmt::Error),
    #[error("Could not create directory {}", .0.display())]
    CreateDir(PathBuf, #[source] io::Error),
    #[error("Could not write {}", .0.display())]
    Write(PathBuf, #[source] io::Error),
}

/// A rendered file. `path` is relative to the output root.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct GeneratedFile {
    pub path: PathBuf,
    pub contents: String,
}

/// Renders all files of one output root.
pub fn render(schema: &Schema, role: HostRole) -> Result<Vec<GeneratedFile>, EmitError> {
    let mut files = vec![];
    let mut root = String::new();
    writeln!(root, "{HEADER}")?;
    writeln!(root)?;
    for protocol in schema.protocols() {
        let module = safe_name(&protocol.name);
        writeln!(root, "pub mod {module};")?;
        let dir = PathBuf::from(&*module);
        files.push(GeneratedFile {
            path: dir.join("mod.rs"),
            contents: render_protocol_mod(protocol)?,
        });
        for interface in &protocol.interfaces {
            files.push(GeneratedFile {
                path: dir.join(format!("{}.rs", safe_name(&interface.name))),
                contents: render_interface(interface, role)?,
            });
        }
    }
    writeln!(root, "pub mod resource;")?;
    files.push(GeneratedFile {
        path: PathBuf::from("resource.rs"),
        contents: render_resource(schema)?,
    });
    files.push(GeneratedFile {
        path: PathBuf::from("mod.rs"),
        contents: root,
    });
    Ok(files)
}

/// Writes rendered files below `dir`. Files whose contents did not change are left alone.
pub fn write_files(dir: &Path, files: &[GeneratedFile]) -> Result<usize, EmitError> {
    let mut written = 0;
    for file in files {
        let path = dir.join(&file.path);
        if let Ok(old) = std::fs::read(&path) {
            if old == file.contents.as_bytes() {
                continue;
            }
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| EmitError::CreateDir(parent.to_owned(), e))?;
        }
        std::fs::write(&path, &file.contents).map_err(|e| EmitError::Write(path.clone(), e))?;
        log::debug!("Wrote {}", path.display());
        written += 1;
    }
    Ok(written)
}

fn render_protocol_mod(protocol: &Protocol) -> Result<String, EmitError> {
    let mut f = String::new();
    writeln!(f, "{HEADER}")?;
    if let Some(copyright) = &protocol.copyright {
        writeln!(f, "//")?;
        for line in copyright.trim().lines() {
            writeln!(f, "// {}", line.trim())?;
        }
    }
    writeln!(f)?;
    for interface in &protocol.interfaces {
        writeln!(f, "pub mod {};", safe_name(&interface.name))?;
    }
    Ok(f)
}

fn struct_name(message: &Message) -> String {
    match message.camel_name.as_str() {
        "Self" => "Self_".to_string(),
        n => n.to_string(),
    }
}

fn field_type(arg: &Arg) -> &'static str {
    match arg.kind {
        ArgKind::Int => "i32",
        ArgKind::Uint => "u32",
        ArgKind::Fixed => "Fixed",
        ArgKind::String if arg.allow_null => "Option<String>",
        ArgKind::String => "String",
        ArgKind::Object | ArgKind::NewId => "ObjectId",
        ArgKind::Array => "Vec<u8>",
        ArgKind::Fd => "Arc<OwnedFd>",
    }
}

fn parse_expr(arg: &Arg) -> &'static str {
    match arg.kind {
        ArgKind::Int => "parser.int()?",
        ArgKind::Uint => "parser.uint()?",
        ArgKind::Fixed => "parser.fixed()?",
        ArgKind::String if arg.allow_null => "parser.optstr()?.map(|s| s.to_string())",
        ArgKind::String => "parser.str()?.to_string()",
        ArgKind::Object | ArgKind::NewId => "parser.object()?",
        ArgKind::Array => "parser.array()?.to_vec()",
        ArgKind::Fd => "Arc::new(parser.fd()?)",
    }
}

fn format_stmt(arg: &Arg) -> String {
    let field = &arg.safe_name;
    match arg.kind {
        ArgKind::Int => format!("fmt.int(self.{field});"),
        ArgKind::Uint => format!("fmt.uint(self.{field});"),
        ArgKind::Fixed => format!("fmt.fixed(self.{field});"),
        ArgKind::String if arg.allow_null => format!("fmt.optstr(self.{field}.as_deref());"),
        ArgKind::String => format!("fmt.string(&self.{field});"),
        ArgKind::Object | ArgKind::NewId => format!("fmt.object(self.{field});"),
        ArgKind::Array => format!("fmt.array(&self.{field});"),
        ArgKind::Fd => format!("fmt.fd(self.{field}.clone());"),
    }
}

/// The encoded length of a message as an expression over its fields.
fn len_expr(message: &Message) -> String {
    let mut fixed = 8;
    let mut dynamic = vec![];
    for arg in &message.args {
        let field = &arg.safe_name;
        match arg.kind {
            ArgKind::String if arg.allow_null => dynamic.push(format!(
                "self.{field}.as_ref().map_or(4, |s| 4 + padded(s.len() + 1))"
            )),
            ArgKind::String => dynamic.push(format!("4 + padded(self.{field}.len() + 1)")),
            ArgKind::Array => dynamic.push(format!("4 + padded(self.{field}.len())")),
            kind => fixed += kind.fixed_len().unwrap_or_default(),
        }
    }
    let mut res = fixed.to_string();
    for d in dynamic {
        res.push_str(" + ");
        res.push_str(&d);
    }
    res
}

fn write_doc(f: &mut String, indent: &str, summary: Option<&str>) -> Result<(), EmitError> {
    if let Some(summary) = summary {
        let summary: Vec<_> = summary.split_whitespace().collect();
        writeln!(f, "{indent}/// {}", summary.join(" "))?;
    }
    Ok(())
}

fn write_message_struct(f: &mut String, message: &Message) -> Result<(), EmitError> {
    let summary = message.description.as_ref().and_then(|d| d.summary.as_deref());
    writeln!(f)?;
    write_doc(f, "    ", summary)?;
    writeln!(f, "    pub struct {} {{", struct_name(message))?;
    for arg in &message.args {
        write_doc(f, "        ", arg.summary.as_deref())?;
        writeln!(f, "        pub {}: {},", arg.safe_name, field_type(arg))?;
    }
    writeln!(f, "    }}")?;
    Ok(())
}

fn write_requests(f: &mut String, interface: &Interface) -> Result<(), EmitError> {
    writeln!(f)?;
    writeln!(f, "pub mod requests {{")?;
    writeln!(f, "    use super::*;")?;
    for message in &interface.requests {
        writeln!(f)?;
        writeln!(f, "    pub const {}: u16 = {};", to_upper(&message.name), message.opcode)?;
        write_message_struct(f, message)?;
        let parser = match message.args.is_empty() {
            true => "_parser",
            false => "parser",
        };
        writeln!(f)?;
        writeln!(f, "    impl {} {{", struct_name(message))?;
        writeln!(
            f,
            "        pub fn parse({parser}: &mut MsgParser<'_, '_>) -> Result<Self, MsgParserError> {{"
        )?;
        writeln!(f, "            Ok(Self {{")?;
        for arg in &message.args {
            writeln!(f, "                {}: {},", arg.safe_name, parse_expr(arg))?;
        }
        writeln!(f, "            }})")?;
        writeln!(f, "        }}")?;
        writeln!(f, "    }}")?;
    }
    writeln!(f, "}}")?;
    Ok(())
}

fn write_events(f: &mut String, interface: &Interface) -> Result<(), EmitError> {
    writeln!(f)?;
    writeln!(f, "pub mod events {{")?;
    writeln!(f, "    use super::*;")?;
    for message in &interface.events {
        let opcode = to_upper(&message.name);
        writeln!(f)?;
        writeln!(f, "    pub const {}: u16 = {};", opcode, message.opcode)?;
        write_message_struct(f, message)?;
        writeln!(f)?;
        writeln!(f, "    impl {} {{", struct_name(message))?;
        writeln!(
            f,
            "        pub fn encode(&self, sender: ObjectId) -> Result<EncodedMessage, EncodeError> {{"
        )?;
        writeln!(f, "            let len = {};", len_expr(message))?;
        writeln!(f, "            if len > MAX_MESSAGE_SIZE {{")?;
        writeln!(f, "                return Err(EncodeError::MessageTooLarge {{ len }});")?;
        writeln!(f, "            }}")?;
        writeln!(f, "            let mut bytes = Vec::with_capacity(len);")?;
        writeln!(f, "            let mut fds = vec![];")?;
        writeln!(f, "            let mut fmt = MsgFormatter::new(&mut bytes, &mut fds);")?;
        writeln!(f, "            fmt.header(sender, {opcode});")?;
        for arg in &message.args {
            writeln!(f, "            {}", format_stmt(arg))?;
        }
        writeln!(f, "            fmt.write_len();")?;
        writeln!(f, "            Ok(EncodedMessage {{ bytes, fds }})")?;
        writeln!(f, "        }}")?;
        writeln!(f, "    }}")?;
    }
    writeln!(f, "}}")?;
    Ok(())
}

fn write_enum(f: &mut String, e: &Enum) -> Result<(), EmitError> {
    let summary = e.description.as_ref().and_then(|d| d.summary.as_deref());
    writeln!(f)?;
    write_doc(f, "    ", summary)?;
    writeln!(f, "    pub mod {} {{", safe_name(&e.name))?;
    for entry in &e.entries {
        write_doc(f, "        ", entry.summary.as_deref())?;
        writeln!(f, "        pub const {}: u32 = {};", to_upper(&entry.name), entry.value)?;
    }
    writeln!(f, "    }}")?;
    Ok(())
}

fn write_handler(f: &mut String, interface: &Interface, role: HostRole) -> Result<(), EmitError> {
    let fallback = match role.default_action() {
        NextAction::Nop => "Nop",
        NextAction::Relay => "Relay",
        NextAction::RelayWait => "RelayWait",
    };
    writeln!(f)?;
    writeln!(f, "pub trait {}Handler<S> {{", interface.camel_name)?;
    for (i, message) in interface.requests.iter().enumerate() {
        if i > 0 {
            writeln!(f)?;
        }
        writeln!(f, "    fn {}(", message.safe_name)?;
        writeln!(f, "        &self,")?;
        writeln!(f, "        resource: &Resource,")?;
        writeln!(f, "        session: &mut S,")?;
        writeln!(f, "        sender: ObjectId,")?;
        writeln!(f, "        request: requests::{},", struct_name(message))?;
        writeln!(f, "    ) -> Result<NextAction, DispatchError> {{")?;
        writeln!(f, "        let _ = (resource, session, sender, request);")?;
        writeln!(f, "        Ok(NextAction::{fallback})")?;
        writeln!(f, "    }}")?;
    }
    writeln!(f, "}}")?;
    Ok(())
}

fn write_dispatch(f: &mut String, interface: &Interface) -> Result<(), EmitError> {
    writeln!(f)?;
    writeln!(f, "pub fn dispatch<S, H: {}Handler<S>>(", interface.camel_name)?;
    writeln!(f, "    handler: &H,")?;
    writeln!(f, "    resource: &Resource,")?;
    writeln!(f, "    session: &mut S,")?;
    writeln!(f, "    sender: ObjectId,")?;
    writeln!(f, "    opcode: u16,")?;
    writeln!(f, "    raw_args: &[u8],")?;
    writeln!(f, "    fds: &mut FdQueue,")?;
    writeln!(f, ") -> Result<NextAction, DispatchError> {{")?;
    if interface.requests.is_empty() {
        writeln!(f, "    #![allow(unused_variables)]")?;
    }
    writeln!(
        f,
        "    let invalid = |source: Option<MsgParserError>| DispatchError::InvalidMethod {{"
    )?;
    writeln!(f, "        opcode,")?;
    writeln!(f, "        args: raw_args.to_vec(),")?;
    writeln!(f, "        source,")?;
    writeln!(f, "    }};")?;
    writeln!(f, "    match opcode {{")?;
    for message in &interface.requests {
        writeln!(f, "        requests::{} => {{", to_upper(&message.name))?;
        let fds = message.fd_count();
        if fds > 0 {
            writeln!(f, "            if fds.len() < {fds} {{")?;
            writeln!(
                f,
                "                return Err(invalid(Some(MsgParserError::MissingFd)));"
            )?;
            writeln!(f, "            }}")?;
        }
        writeln!(f, "            let mut parser = MsgParser::new(fds, raw_args);")?;
        writeln!(
            f,
            "            let request = requests::{}::parse(&mut parser).map_err(|e| invalid(Some(e)))?;",
            struct_name(message)
        )?;
        writeln!(f, "            parser.eof().map_err(|e| invalid(Some(e)))?;")?;
        writeln!(
            f,
            "            handler.{}(resource, session, sender, request)",
            message.safe_name
        )?;
        writeln!(f, "        }}")?;
    }
    writeln!(f, "        _ => Err(invalid(None)),")?;
    writeln!(f, "    }}")?;
    writeln!(f, "}}")?;
    Ok(())
}

/// Writes a match over the variants of `TypedResource` that binds the resource to `r`.
fn write_arms(
    f: &mut String,
    indent: &str,
    scrutinee: &str,
    by_ref: bool,
    modules: &[(String, &String)],
    body: impl Fn(&str) -> String,
) -> Result<(), EmitError> {
    if modules.is_empty() {
        let deref = if by_ref { "*" } else { "" };
        writeln!(f, "{indent}match {deref}{scrutinee} {{}}")?;
        return Ok(());
    }
    writeln!(f, "{indent}match {scrutinee} {{")?;
    for (module, camel) in modules {
        writeln!(f, "{indent}    TypedResource::{camel}(r) => {},", body(module))?;
    }
    writeln!(f, "{indent}}}")?;
    Ok(())
}

/// Renders the root `resource` module over all interfaces of the schema.
pub fn render_resource(schema: &Schema) -> Result<String, EmitError> {
    let mut modules = vec![];
    for protocol in schema.protocols() {
        for interface in &protocol.interfaces {
            let module = format!(
                "super::{}::{}",
                safe_name(&protocol.name),
                safe_name(&interface.name)
            );
            modules.push((module, &interface.camel_name));
        }
    }
    let mut f = String::new();
    writeln!(f, "{HEADER}")?;
    writeln!(f, "#![allow(dead_code, unused_imports, clippy::all)]")?;
    writeln!(f)?;
    writeln!(f, "use wire_relay::{{")?;
    writeln!(f, "    codec::FdQueue,")?;
    writeln!(f, "    dispatch::{{DispatchError, NextAction, Resource}},")?;
    writeln!(f, "    object::ObjectId,")?;
    writeln!(f, "}};")?;

    writeln!(f)?;
    writeln!(f, "/// A resource tagged with its interface.")?;
    writeln!(f, "pub enum TypedResource {{")?;
    for (_, camel) in &modules {
        writeln!(f, "    {camel}(Resource),")?;
    }
    writeln!(f, "}}")?;

    writeln!(f)?;
    writeln!(f, "impl TypedResource {{")?;
    writeln!(f, "    pub fn resource(&self) -> &Resource {{")?;
    write_arms(&mut f, "        ", "self", true, &modules, |_| "r".to_string())?;
    writeln!(f, "    }}")?;
    writeln!(f, "}}")?;

    writeln!(f)?;
    writeln!(f, "impl From<TypedResource> for Resource {{")?;
    writeln!(f, "    fn from(resource: TypedResource) -> Self {{")?;
    write_arms(&mut f, "        ", "resource", false, &modules, |_| "r".to_string())?;
    writeln!(f, "    }}")?;
    writeln!(f, "}}")?;

    writeln!(f)?;
    writeln!(f, "impl TryFrom<Resource> for TypedResource {{")?;
    writeln!(f, "    type Error = Resource;")?;
    writeln!(f)?;
    writeln!(f, "    fn try_from(resource: Resource) -> Result<Self, Resource> {{")?;
    writeln!(f, "        let interface = resource.interface().clone();")?;
    writeln!(f, "        match interface.name.as_str() {{")?;
    for (module, camel) in &modules {
        writeln!(f, "            {module}::NAME => Ok(Self::{camel}(resource)),")?;
    }
    writeln!(f, "            _ => Err(resource),")?;
    writeln!(f, "        }}")?;
    writeln!(f, "    }}")?;
    writeln!(f, "}}")?;

    let bounds: Vec<_> = modules
        .iter()
        .map(|(module, camel)| format!("{module}::{camel}Handler<S>"))
        .collect();
    writeln!(f)?;
    writeln!(f, "/// Implemented by every type that handles the requests of all interfaces.")?;
    if bounds.is_empty() {
        writeln!(f, "pub trait Handlers<S> {{}}")?;
        writeln!(f)?;
        writeln!(f, "impl<S, H> Handlers<S> for H {{}}")?;
    } else {
        writeln!(f, "pub trait Handlers<S>: {} {{}}", bounds.join(" + "))?;
        writeln!(f)?;
        writeln!(f, "impl<S, H> Handlers<S> for H where H: {} {{}}", bounds.join(" + "))?;
    }

    writeln!(f)?;
    writeln!(f, "pub fn dispatch_request<S, H: Handlers<S>>(")?;
    writeln!(f, "    handler: &H,")?;
    writeln!(f, "    resource: &TypedResource,")?;
    writeln!(f, "    session: &mut S,")?;
    writeln!(f, "    sender: ObjectId,")?;
    writeln!(f, "    opcode: u16,")?;
    writeln!(f, "    raw_args: &[u8],")?;
    writeln!(f, "    fds: &mut FdQueue,")?;
    writeln!(f, ") -> Result<NextAction, DispatchError> {{")?;
    write_arms(&mut f, "    ", "resource", true, &modules, |module| {
        format!("{module}::dispatch(handler, r, session, sender, opcode, raw_args, fds)")
    })?;
    writeln!(f, "}}")?;
    Ok(f)
}

/// Renders the module of one interface.
pub fn render_interface(interface: &Interface, role: HostRole) -> Result<String, EmitError> {
    let mut f = String::new();
    writeln!(f, "{HEADER}")?;
    writeln!(f, "#![allow(dead_code, unused_imports, clippy::all)]")?;
    writeln!(f)?;
    writeln!(f, "use {{")?;
    writeln!(f, "    std::sync::Arc,")?;
    writeln!(f, "    uapi::OwnedFd,")?;
    writeln!(f, "    wire_relay::{{")?;
    writeln!(
        f,
        "        codec::{{EncodeError, EncodedMessage, FdQueue, MAX_MESSAGE_SIZE, MsgFormatter, MsgParser, MsgParserError, padded}},"
    )?;
    writeln!(f, "        dispatch::{{DispatchError, NextAction, Resource}},")?;
    writeln!(f, "        fixed::Fixed,")?;
    writeln!(f, "        object::ObjectId,")?;
    writeln!(f, "    }},")?;
    writeln!(f, "}};")?;
    writeln!(f)?;
    let summary = interface.description.as_ref().and_then(|d| d.summary.as_deref());
    write_doc(&mut f, "", summary)?;
    writeln!(f, "pub const NAME: &str = \"{}\";", interface.name)?;
    writeln!(f, "pub const VERSION: u32 = {};", interface.version)?;
    if let Some(name) = interface.global_singleton {
        writeln!(f, "pub const GLOBAL_SINGLETON_NAME: u32 = {name};")?;
    }
    write_requests(&mut f, interface)?;
    write_events(&mut f, interface)?;
    writeln!(f)?;
    writeln!(f, "pub mod enums {{")?;
    for e in &interface.enums {
        write_enum(&mut f, e)?;
    }
    writeln!(f, "}}")?;
    write_handler(&mut f, interface, role)?;
    write_dispatch(&mut f, interface)?;
    Ok(f)
}
