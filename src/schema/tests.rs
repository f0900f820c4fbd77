use {
    crate::{
        config::GeneratorConfig,
        schema::{ArgKind, Schema, SchemaError, build, safe_name},
        test_utils::interface,
    },
    xml_to_wire::Element,
};

fn parse(doc: &str) -> Element {
    let mut roots = xml_to_wire::parse(doc.as_bytes()).unwrap();
    assert_eq!(roots.len(), 1);
    roots.remove(0)
}

fn build_str(doc: &str) -> Result<crate::schema::Protocol, SchemaError> {
    build(&parse(doc), &GeneratorConfig::default())
}

fn inner(e: SchemaError) -> SchemaError {
    match e {
        SchemaError::Protocol(_, e) | SchemaError::Interface(_, e) => inner(*e),
        e => e,
    }
}

const SURFACE: &str = r#"
<protocol name="wayland">
  <copyright>text</copyright>
  <interface name="wl_surface" version="6">
    <description summary="an onscreen surface">A surface.</description>
    <request name="destroy" type="destructor"/>
    <request name="attach">
      <arg name="buffer" type="object" interface="wl_buffer" allow-null="true"/>
      <arg name="x" type="int"/>
      <arg name="y" type="int"/>
    </request>
    <request name="damage">
      <arg name="x" type="int"/>
    </request>
    <event name="enter">
      <arg name="output" type="object" interface="wl_output"/>
    </event>
    <enum name="error">
      <entry name="invalid_scale" value="0"/>
      <entry name="invalid_transform" value="0x1"/>
    </enum>
  </interface>
  <interface name="wl_shell" version="1">
    <request name="get_shell_surface">
      <arg name="id" type="new_id" interface="wl_shell_surface"/>
    </request>
  </interface>
  <interface name="wl_shm" version="1">
    <request name="create_pool">
      <arg name="id" type="new_id" interface="wl_shm_pool"/>
      <arg name="fd" type="fd"/>
      <arg name="size" type="int"/>
    </request>
  </interface>
</protocol>
"#;

#[test]
fn sorted_views_keep_opcodes() {
    let protocol = build_str(SURFACE).unwrap();
    assert_eq!(protocol.copyright.as_deref(), Some("text"));
    let surface = &protocol.interfaces[0];
    assert_eq!(surface.name, "wl_surface");
    assert_eq!(surface.camel_name, "WlSurface");
    assert_eq!(surface.version, 6);
    let names: Vec<_> = surface.requests.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, ["attach", "damage", "destroy"]);
    assert_eq!(surface.request(0).unwrap().name, "destroy");
    assert_eq!(surface.request(1).unwrap().name, "attach");
    assert_eq!(surface.request(2).unwrap().name, "damage");
    assert!(surface.request(3).is_none());
    assert!(surface.request(0).unwrap().destructor);
    let by_opcode: Vec<_> = surface.requests_by_opcode().map(|r| r.opcode).collect();
    assert_eq!(by_opcode, [0, 1, 2]);
    let attach = surface.request_by_name("attach").unwrap();
    assert_eq!(attach.args[0].kind, ArgKind::Object);
    assert!(attach.args[0].allow_null);
    assert_eq!(attach.args[0].interface.as_deref(), Some("wl_buffer"));
    assert_eq!(surface.enums[0].entries[1].value, 1);
    assert_eq!(surface.enums[0].entries[1].name, "invalid_transform");
    assert_eq!(
        surface.description.as_ref().unwrap().summary.as_deref(),
        Some("an onscreen surface"),
    );
}

#[test]
fn events_in_opcode_order() {
    let kinds = interface("test_kinds");
    let names: Vec<_> = kinds.events.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, ["blob", "notify"]);
    let by_opcode: Vec<_> = kinds
        .events_by_opcode()
        .map(|e| (e.opcode, e.name.as_str()))
        .collect();
    assert_eq!(by_opcode, [(0, "notify"), (1, "blob")]);
    assert_eq!(kinds.event(1).unwrap().name, "blob");
}

#[test]
fn exclusion_and_singletons() {
    let protocol = build_str(SURFACE).unwrap();
    let names: Vec<_> = protocol.interfaces.iter().map(|i| i.name.as_str()).collect();
    assert_eq!(names, ["wl_surface", "wl_shm"]);
    assert_eq!(protocol.interfaces[0].global_singleton, None);
    assert_eq!(protocol.interfaces[1].global_singleton, Some(3));
    assert_eq!(protocol.interfaces[1].request(0).unwrap().fd_count(), 1);
}

#[test]
fn digit_entries_prefix_whole_enum() {
    let doc = r#"
    <protocol name="wayland">
      <interface name="wl_output" version="4">
        <enum name="transform">
          <entry name="normal" value="0"/>
          <entry name="90" value="1"/>
          <entry name="flipped" value="4"/>
        </enum>
      </interface>
    </protocol>"#;
    let protocol = build_str(doc).unwrap();
    let entries: Vec<_> = protocol.interfaces[0].enums[0]
        .entries
        .iter()
        .map(|e| (e.name.as_str(), e.raw_name.as_str(), e.value))
        .collect();
    assert_eq!(
        entries,
        [
            ("transform_normal", "normal", 0),
            ("transform_90", "90", 1),
            ("transform_flipped", "flipped", 4),
        ],
    );
}

#[test]
fn invalid_entry_name() {
    let doc = r#"
    <protocol name="p">
      <interface name="i" version="1">
        <enum name="e"><entry name="Upper" value="0"/></enum>
      </interface>
    </protocol>"#;
    let err = inner(build_str(doc).unwrap_err());
    assert!(matches!(
        err,
        SchemaError::InvalidEntryName { enum_, entry } if enum_ == "e" && entry == "Upper",
    ));
}

#[test]
fn duplicate_copyright() {
    let doc = r#"<protocol name="p"><copyright>a</copyright><copyright>b</copyright></protocol>"#;
    let err = inner(build_str(doc).unwrap_err());
    assert!(matches!(err, SchemaError::DuplicateCopyright(p) if p == "p"));
}

#[test]
fn duplicate_description() {
    let doc = r#"
    <protocol name="p">
      <interface name="i" version="1">
        <request name="r">
          <arg name="a" type="uint"><description>x</description><description>y</description></arg>
        </request>
      </interface>
    </protocol>"#;
    let err = inner(build_str(doc).unwrap_err());
    assert!(matches!(err, SchemaError::DuplicateDescription(_)));
}

#[test]
fn unknown_element() {
    let doc = r#"
    <protocol name="p">
      <interface name="i" version="1"><signal name="x"/></interface>
    </protocol>"#;
    let err = inner(build_str(doc).unwrap_err());
    assert!(matches!(err, SchemaError::UnknownElement { child, .. } if child == "signal"));
}

#[test]
fn unknown_arg_type() {
    let doc = r#"
    <protocol name="p">
      <interface name="i" version="1">
        <event name="e"><arg name="a" type="double"/></event>
      </interface>
    </protocol>"#;
    let err = inner(build_str(doc).unwrap_err());
    assert!(matches!(err, SchemaError::UnknownArgType { ty, .. } if ty == "double"));
}

#[test]
fn missing_version() {
    let doc = r#"<protocol name="p"><interface name="i"/></protocol>"#;
    let err = inner(build_str(doc).unwrap_err());
    assert!(matches!(
        err,
        SchemaError::MissingAttribute {
            attribute: "version",
            ..
        }
    ));
}

#[test]
fn not_a_protocol() {
    let err = build_str("<interface name=\"i\" version=\"1\"/>").unwrap_err();
    assert!(matches!(err, SchemaError::NotAProtocol(n) if n == "interface"));
}

#[test]
fn duplicate_message() {
    let doc = r#"
    <protocol name="p">
      <interface name="i" version="1"><request name="r"/><request name="r"/></interface>
    </protocol>"#;
    let err = inner(build_str(doc).unwrap_err());
    assert!(matches!(err, SchemaError::DuplicateMessage { name, .. } if name == "r"));
}

#[test]
fn reserved_names() {
    assert_eq!(safe_name("move"), "move_");
    assert_eq!(safe_name("type"), "type_");
    assert_eq!(safe_name("resize"), "resize");
    let doc = r#"
    <protocol name="p">
      <interface name="i" version="1">
        <request name="move"><arg name="type" type="uint"/></request>
      </interface>
    </protocol>"#;
    let protocol = build_str(doc).unwrap();
    let request = protocol.interfaces[0].request(0).unwrap();
    assert_eq!(request.name, "move");
    assert_eq!(request.safe_name, "move_");
    assert_eq!(request.args[0].safe_name, "type_");
}

#[test]
fn duplicate_interface_across_protocols() {
    let a = parse(r#"<protocol name="a"><interface name="x" version="1"/></protocol>"#);
    let b = parse(r#"<protocol name="b"><interface name="x" version="2"/></protocol>"#);
    let c = parse(r#"<protocol name="c"><interface name="y" version="2"/></protocol>"#);
    let config = GeneratorConfig::default();
    let schema = Schema::build(&[a.clone(), c], &config).unwrap();
    assert_eq!(schema.interface("y").unwrap().protocol, "c");
    assert_eq!(schema.protocols().len(), 2);
    let err = Schema::build(&[a, b], &config).unwrap_err();
    assert!(matches!(err, SchemaError::DuplicateInterface(n) if n == "x"));
}
