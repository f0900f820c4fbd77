use crate::{
    config::{ConfigError, GeneratorConfig, GlobalSingleton, InterfaceRef},
    dispatch::HostRole,
};

fn iref(protocol: &str, interface: &str) -> InterfaceRef {
    InterfaceRef {
        protocol: protocol.to_string(),
        interface: interface.to_string(),
    }
}

#[test]
fn defaults() {
    let config = GeneratorConfig::default();
    config.validate().unwrap();
    assert!(config.is_excluded("wayland", "wl_shell"));
    assert!(config.is_excluded("wayland", "wl_shell_surface"));
    assert!(!config.is_excluded("wayland", "wl_surface"));
    assert!(!config.is_excluded("xdg_shell", "wl_shell"));
    assert_eq!(config.global_singleton("wayland", "wl_display"), Some(1));
    assert_eq!(config.global_singleton("wayland", "wl_registry"), Some(4));
    assert_eq!(config.global_singleton("xdg_shell", "xdg_wm_base"), Some(6));
    assert_eq!(config.global_singleton("wayland", "wl_surface"), None);
    assert_eq!(config.outputs.len(), 2);
    assert_eq!(config.outputs[1].role, HostRole::Observer);
}

#[test]
fn partial_file() {
    let json = r#"{ "excluded": [ { "protocol": "wayland", "interface": "wl_seat" } ] }"#;
    let config: GeneratorConfig = serde_json::from_str(json).unwrap();
    assert!(config.is_excluded("wayland", "wl_seat"));
    assert!(!config.is_excluded("wayland", "wl_shell"));
    assert_eq!(config.global_singleton("wayland", "wl_shm"), Some(3));
}

#[test]
fn outputs_from_file() {
    let json = r#"{ "outputs": [ { "project": "mirror", "role": "observer", "dir": "out" } ] }"#;
    let config: GeneratorConfig = serde_json::from_str(json).unwrap();
    assert_eq!(config.outputs.len(), 1);
    assert_eq!(config.outputs[0].role, HostRole::Observer);
}

#[test]
fn excluded_singleton() {
    let mut config = GeneratorConfig::default();
    config.excluded.push(iref("wayland", "wl_shm"));
    assert!(matches!(
        config.validate(),
        Err(ConfigError::ExcludedSingleton(i)) if i == iref("wayland", "wl_shm"),
    ));
}

#[test]
fn duplicate_singleton_name() {
    let mut config = GeneratorConfig::default();
    config.global_singletons.push(GlobalSingleton {
        interface: iref("wayland", "wl_seat"),
        name: 2,
    });
    assert!(matches!(
        config.validate(),
        Err(ConfigError::DuplicateSingletonName(2))
    ));
}
