use {
    crate::{dispatch::DispatchError, object::ObjectId, schema::Interface},
    ahash::AHashMap,
    parking_lot::{
        MappedRwLockReadGuard, MappedRwLockWriteGuard, RwLock, RwLockReadGuard,
        RwLockWriteGuard,
    },
    std::{any::Any, sync::Arc},
};

type Data = Box<dyn Any + Send + Sync>;

/// An object of a connection together with the state the host keeps for it.
#[derive(Clone)]
pub struct Resource {
    id: ObjectId,
    interface: Arc<Interface>,
    version: u32,
    data: Arc<RwLock<Data>>,
}

impl Resource {
    pub fn new<T: Any + Send + Sync>(
        id: ObjectId,
        interface: Arc<Interface>,
        version: u32,
        data: T,
    ) -> Self {
        Self {
            id,
            interface,
            version,
            data: Arc::new(RwLock::new(Box::new(data))),
        }
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn interface(&self) -> &Arc<Interface> {
        &self.interface
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    /// Returns the state of this object if it has type `T`.
    pub fn read<T: Any>(&self) -> Option<MappedRwLockReadGuard<'_, T>> {
        RwLockReadGuard::try_map(self.data.read(), |d| (**d).downcast_ref::<T>()).ok()
    }

    pub fn write<T: Any>(&self) -> Option<MappedRwLockWriteGuard<'_, T>> {
        RwLockWriteGuard::try_map(self.data.write(), |d| (**d).downcast_mut::<T>()).ok()
    }
}

/// The objects of one connection.
#[derive(Default)]
pub struct Objects {
    objects: AHashMap<ObjectId, Resource>,
    /// The live instance of each global-singleton interface.
    singletons: AHashMap<String, ObjectId>,
}

impl Objects {
    /// Adds `resource`, replacing the object with the same id.
    ///
    /// Fails if another object of the same global-singleton interface is alive.
    pub fn insert(&mut self, resource: Resource) -> Result<Option<Resource>, DispatchError> {
        let id = resource.id;
        let singleton = resource.interface.global_singleton.is_some();
        if singleton
            && let Some(&live) = self.singletons.get(&resource.interface.name)
            && live != id
        {
            return Err(DispatchError::DuplicateSingleton {
                interface: resource.interface.name.clone(),
                live,
            });
        }
        let prev = self.remove(id);
        if singleton {
            self.singletons.insert(resource.interface.name.clone(), id);
        }
        self.objects.insert(id, resource);
        Ok(prev)
    }

    pub fn get(&self, id: ObjectId) -> Option<&Resource> {
        self.objects.get(&id)
    }

    pub fn remove(&mut self, id: ObjectId) -> Option<Resource> {
        let resource = self.objects.remove(&id)?;
        if self.singletons.get(&resource.interface.name) == Some(&id) {
            self.singletons.remove(&resource.interface.name);
        }
        Some(resource)
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }
}

/// Host state of one connection.
pub trait Session: Send + 'static {
    fn objects(&self) -> &Objects;

    fn objects_mut(&mut self) -> &mut Objects;
}
