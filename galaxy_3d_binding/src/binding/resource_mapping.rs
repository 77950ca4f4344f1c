//! Name to object table used by bulk binding

use rustc_hash::FxHashMap;

use crate::device::DeviceObject;

/// Objects addressed by `(name, array index)`
#[derive(Debug, Clone, Default)]
pub struct ResourceMapping {
    entries: FxHashMap<(String, u32), DeviceObject>,
}

impl ResourceMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Map element 0 of `name`, replacing any previous object
    pub fn set_resource(&mut self, name: impl Into<String>, object: impl Into<DeviceObject>) {
        self.entries.insert((name.into(), 0), object.into());
    }

    /// Map elements `first..first + objects.len()` of `name`
    pub fn set_resource_array(&mut self, name: &str, first: u32, objects: &[DeviceObject]) {
        for (i, object) in objects.iter().enumerate() {
            self.entries.insert((name.to_string(), first + i as u32), object.clone());
        }
    }

    pub fn get_resource(&self, name: &str, array_index: u32) -> Option<&DeviceObject> {
        self.entries.get(&(name.to_string(), array_index))
    }

    pub fn remove_resource(&mut self, name: &str, array_index: u32) -> Option<DeviceObject> {
        self.entries.remove(&(name.to_string(), array_index))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
#[path = "resource_mapping_tests.rs"]
mod tests;
