use {
    crate::{
        codec::ArgValue,
        config::GeneratorConfig,
        schema::{Interface, Protocol, build},
    },
    std::sync::Arc,
    uapi::{OwnedFd, c::EFD_CLOEXEC},
};

pub const PROTOCOL: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<protocol name="wayland">
  <copyright>Test protocol</copyright>
  <interface name="wl_display" version="1">
    <request name="sync">
      <arg name="callback" type="new_id" interface="wl_callback"/>
    </request>
    <request name="get_registry">
      <arg name="registry" type="new_id" interface="wl_registry"/>
    </request>
    <event name="error">
      <arg name="object_id" type="object"/>
      <arg name="code" type="uint"/>
      <arg name="message" type="string"/>
    </event>
    <event name="delete_id">
      <arg name="id" type="uint"/>
    </event>
    <enum name="error">
      <entry name="invalid_object" value="0"/>
      <entry name="invalid_method" value="1"/>
      <entry name="no_memory" value="2"/>
      <entry name="implementation" value="3"/>
    </enum>
  </interface>
  <interface name="wl_shm" version="1">
    <request name="create_pool">
      <arg name="id" type="new_id" interface="wl_shm_pool"/>
      <arg name="fd" type="fd"/>
      <arg name="size" type="int"/>
    </request>
  </interface>
  <interface name="test_kinds" version="3">
    <request name="everything">
      <arg name="i" type="int"/>
      <arg name="u" type="uint"/>
      <arg name="f" type="fixed"/>
      <arg name="s" type="string"/>
      <arg name="o" type="object"/>
      <arg name="n" type="new_id"/>
      <arg name="a" type="array"/>
      <arg name="fd" type="fd"/>
    </request>
    <request name="label">
      <arg name="text" type="string" allow-null="true"/>
    </request>
    <request name="two_fds">
      <arg name="first" type="fd"/>
      <arg name="second" type="fd"/>
    </request>
    <request name="move"/>
    <request name="destroy" type="destructor"/>
    <request name="tagged">
      <arg name="fd" type="fd"/>
      <arg name="tag" type="int"/>
    </request>
    <event name="notify">
      <arg name="text" type="string"/>
    </event>
    <event name="blob">
      <arg name="data" type="array"/>
    </event>
  </interface>
</protocol>
"#;

pub fn protocol() -> Protocol {
    let roots = xml_to_wire::parse(PROTOCOL.as_bytes()).unwrap();
    build(&roots[0], &GeneratorConfig::default()).unwrap()
}

pub fn interface(name: &str) -> Arc<Interface> {
    protocol()
        .interfaces
        .into_iter()
        .find(|i| i.name == name)
        .unwrap()
}

pub fn eventfd() -> OwnedFd {
    uapi::eventfd(0, EFD_CLOEXEC).unwrap()
}

/// A descriptor argument for encoding messages whose descriptors are not inspected.
pub fn fd_arg() -> ArgValue {
    ArgValue::Fd(Arc::new(eventfd()))
}
