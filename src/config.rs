#[cfg(test)]
mod tests;

use {
    crate::dispatch::HostRole,
    ahash::AHashSet,
    serde::{Deserialize, Serialize},
    std::{io, path::PathBuf},
    thiserror::Error,
};

/// Interfaces that are never generated.
const DEFAULT_EXCLUDED: &[(&str, &str)] = &[
    ("wayland", "wl_shell"),
    ("wayland", "wl_shell_surface"),
];

/// Interfaces with a single pre-registered instance and its well-known name.
const DEFAULT_GLOBAL_SINGLETONS: &[(&str, &str, u32)] = &[
    ("wayland", "wl_display", 1),
    ("wayland", "wl_compositor", 2),
    ("wayland", "wl_shm", 3),
    ("wayland", "wl_registry", 4),
    ("wayland", "wl_data_device_manager", 5),
    ("xdg_shell", "xdg_wm_base", 6),
];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Could not read {0}")]
    Read(String, #[source] io::Error),
    #[error("Could not parse {0}")]
    Parse(String, #[source] serde_json::Error),
    #[error("Interface {0} is both excluded and a global singleton")]
    ExcludedSingleton(InterfaceRef),
    #[error("Interface {0} is listed as a global singleton more than once")]
    DuplicateSingleton(InterfaceRef),
    #[error("Global singleton name {0} is used more than once")]
    DuplicateSingletonName(u32),
    #[error("Output project {0} is configured more than once")]
    DuplicateProject(String),
}

#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct InterfaceRef {
    pub protocol: String,
    pub interface: String,
}

impl std::fmt::Display for InterfaceRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.protocol, self.interface)
    }
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct GlobalSingleton {
    #[serde(flatten)]
    pub interface: InterfaceRef,
    pub name: u32,
}

/// A host project that receives generated sources.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct OutputRoot {
    pub project: String,
    pub role: HostRole,
    pub dir: PathBuf,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GeneratorConfig {
    pub excluded: Vec<InterfaceRef>,
    pub global_singletons: Vec<GlobalSingleton>,
    pub outputs: Vec<OutputRoot>,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        let iref = |protocol: &str, interface: &str| InterfaceRef {
            protocol: protocol.to_string(),
            interface: interface.to_string(),
        };
        Self {
            excluded: DEFAULT_EXCLUDED.iter().map(|(p, i)| iref(p, i)).collect(),
            global_singletons: DEFAULT_GLOBAL_SINGLETONS
                .iter()
                .map(|&(p, i, name)| GlobalSingleton {
                    interface: iref(p, i),
                    name,
                })
                .collect(),
            outputs: vec![
                OutputRoot {
                    project: "interceptor".to_string(),
                    role: HostRole::Interceptor,
                    dir: PathBuf::from("interceptor/src/protocol"),
                },
                OutputRoot {
                    project: "observer".to_string(),
                    role: HostRole::Observer,
                    dir: PathBuf::from("observer/src/protocol"),
                },
            ],
        }
    }
}

impl GeneratorConfig {
    /// Loads a configuration file. Fields missing from the file keep their defaults.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let data = std::fs::read(path).map_err(|e| ConfigError::Read(path.to_string(), e))?;
        let config: Self =
            serde_json::from_slice(&data).map_err(|e| ConfigError::Parse(path.to_string(), e))?;
        config.validate()?;
        log::debug!(
            "Loaded {}: {} excluded interfaces, {} global singletons, {} outputs",
            path,
            config.excluded.len(),
            config.global_singletons.len(),
            config.outputs.len(),
        );
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut interfaces = AHashSet::new();
        let mut names = AHashSet::new();
        for singleton in &self.global_singletons {
            if self.excluded.contains(&singleton.interface) {
                return Err(ConfigError::ExcludedSingleton(singleton.interface.clone()));
            }
            if !interfaces.insert(&singleton.interface) {
                return Err(ConfigError::DuplicateSingleton(singleton.interface.clone()));
            }
            if !names.insert(singleton.name) {
                return Err(ConfigError::DuplicateSingletonName(singleton.name));
            }
        }
        let mut projects = AHashSet::new();
        for output in &self.outputs {
            if !projects.insert(&output.project) {
                return Err(ConfigError::DuplicateProject(output.project.clone()));
            }
        }
        Ok(())
    }

    pub fn is_excluded(&self, protocol: &str, interface: &str) -> bool {
        self.excluded
            .iter()
            .any(|e| e.protocol == protocol && e.interface == interface)
    }

    pub fn global_singleton(&self, protocol: &str, interface: &str) -> Option<u32> {
        self.global_singletons
            .iter()
            .find(|g| g.interface.protocol == protocol && g.interface.interface == interface)
            .map(|g| g.name)
    }
}
