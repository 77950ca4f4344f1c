//! Shader resource variable handles

use std::sync::Mutex;

use crate::binding::attribs::{CacheLocation, ResourceAttribs};
use crate::binding::binding_model::{BindingModel, SlotScope};
use crate::binding::resource_cache::{CacheContentType, ShaderResourceCache};
use crate::binding::resource_desc::{
    PipelineResourceDesc, PipelineResourceFlags, SetShaderResourceFlags, ShaderResourceType, VariableType,
};
use crate::binding::signature::{lock_cache, PipelineResourceSignature};
use crate::binding::verify::{verify_resource_binding, BindTarget};
use crate::device::DeviceObject;

/// Handle to one variable of a signature's static cache or of an SRB
///
/// The handle borrows the cache it writes into; it is cheap to create and is
/// obtained from `get_variable_by_name` / `get_variable_by_index`.
pub struct ShaderResourceVariable<'a, B: BindingModel> {
    signature: &'a PipelineResourceSignature<B>,
    cache: &'a Mutex<ShaderResourceCache>,
    content: CacheContentType,
    resource_index: u32,
    var_index: u32,
}

impl<'a, B: BindingModel> ShaderResourceVariable<'a, B> {
    pub(crate) fn new(
        signature: &'a PipelineResourceSignature<B>,
        cache: &'a Mutex<ShaderResourceCache>,
        content: CacheContentType,
        resource_index: u32,
        var_index: u32,
    ) -> Self {
        Self {
            signature,
            cache,
            content,
            resource_index,
            var_index,
        }
    }

    // ===== QUERIES =====

    pub fn resource_desc(&self) -> &'a PipelineResourceDesc {
        self.signature.resource(self.resource_index)
    }

    fn attribs(&self) -> &'a ResourceAttribs {
        self.signature.attribs(self.resource_index)
    }

    pub fn name(&self) -> &'a str {
        &self.resource_desc().name
    }

    pub fn get_type(&self) -> VariableType {
        self.resource_desc().var_type
    }

    /// Index of the variable within its manager
    pub fn get_index(&self) -> u32 {
        self.var_index
    }

    /// Index of the resource within the signature
    pub fn resource_index(&self) -> u32 {
        self.resource_index
    }

    pub fn array_size(&self) -> u32 {
        self.resource_desc().array_size
    }

    fn location_of(&self, attribs: &ResourceAttribs) -> Option<CacheLocation> {
        match self.content {
            CacheContentType::Signature => attribs.static_location,
            CacheContentType::Srb => Some(attribs.srb_location),
        }
    }

    /// Object bound to element `elem`
    pub fn get(&self, elem: u32) -> Option<DeviceObject> {
        let location = self.location_of(self.attribs())?;
        lock_cache(self.cache).get_object(&location, elem)
    }

    pub fn is_bound(&self, elem: u32) -> bool {
        match self.location_of(self.attribs()) {
            Some(location) if elem < self.array_size() => lock_cache(self.cache).is_resource_bound(&location, elem),
            _ => false,
        }
    }

    fn check_array_index(&self, elem: u32, count: u32) -> bool {
        let size = self.array_size();
        if elem.checked_add(count).is_some_and(|end| end <= size) {
            return true;
        }
        crate::engine_error!(
            "galaxy3d::ShaderVariable",
            "Elements {}..{} are out of range for variable '{}' of signature '{}' (array size {})",
            elem,
            elem.saturating_add(count),
            self.name(),
            self.signature.name(),
            size
        );
        false
    }

    // ===== BINDING =====

    /// Bind `object` to element 0
    pub fn set(&self, object: Option<DeviceObject>) -> bool {
        self.bind(object, 0, SetShaderResourceFlags::empty())
    }

    pub fn set_with_flags(&self, object: Option<DeviceObject>, flags: SetShaderResourceFlags) -> bool {
        self.bind(object, 0, flags)
    }

    /// Bind `object` to element `elem`; `None` unbinds it
    ///
    /// Returns `false` and leaves the element unchanged when the binding is refused.
    pub fn bind(&self, object: Option<DeviceObject>, elem: u32, flags: SetShaderResourceFlags) -> bool {
        if !self.check_array_index(elem, 1) {
            return false;
        }
        let mut cache = lock_cache(self.cache);
        self.bind_locked(&mut cache, object, elem, flags)
    }

    /// Bind `objects` to elements `first..first + objects.len()`
    ///
    /// A range that does not fit the array is refused as a whole.
    pub fn set_array(&self, objects: &[Option<DeviceObject>], first: u32, flags: SetShaderResourceFlags) -> bool {
        if !self.check_array_index(first, objects.len() as u32) {
            return false;
        }
        let mut cache = lock_cache(self.cache);
        let mut all_bound = true;
        for (i, object) in objects.iter().enumerate() {
            all_bound &= self.bind_locked(&mut cache, object.clone(), first + i as u32, flags);
        }
        all_bound
    }

    fn bind_locked(
        &self,
        cache: &mut ShaderResourceCache,
        object: Option<DeviceObject>,
        elem: u32,
        flags: SetShaderResourceFlags,
    ) -> bool {
        let attribs = self.attribs();
        let Some(location) = self.location_of(attribs) else {
            return false;
        };
        let current = cache.get_object(&location, elem);
        let target = BindTarget {
            signature: self.signature.name(),
            desc: self.resource_desc(),
            elem,
        };
        let allow_overwrite = flags.contains(SetShaderResourceFlags::ALLOW_OVERWRITE);
        if !verify_resource_binding(&target, object.as_ref(), current.as_ref(), allow_overwrite) {
            return false;
        }

        self.bind_assigned_sampler(cache, attribs, object.as_ref(), elem);
        cache.set_resource(&location, elem, object);
        true
    }

    /// Flat models: a texture SRV paired with a separate sampler also binds the view's default sampler
    fn bind_assigned_sampler(
        &self,
        cache: &mut ShaderResourceCache,
        attribs: &ResourceAttribs,
        object: Option<&DeviceObject>,
        elem: u32,
    ) {
        if B::SCOPE != SlotScope::PerStage {
            return;
        }
        let Some(sampler_index) = attribs.assigned_sampler else {
            return;
        };
        let sampler_attribs = self.signature.attribs(sampler_index);
        if sampler_attribs.is_immutable_sampler_assigned() {
            return;
        }
        let Some(location) = self.location_of(sampler_attribs) else {
            return;
        };
        let sampler_size = self.signature.resource(sampler_index).array_size;
        let sampler_elem = if sampler_size == 1 { 0 } else { elem.min(sampler_size - 1) };

        let sampler = object
            .and_then(|o| o.as_texture_view())
            .and_then(|view| view.sampler())
            .map(DeviceObject::Sampler);
        if object.is_some() && sampler.is_none() {
            crate::engine_warn!(
                "galaxy3d::ShaderVariable",
                "The view bound to '{}' has no default sampler; sampler '{}' is left unbound",
                self.name(),
                self.signature.resource(sampler_index).name
            );
        }
        cache.set_resource(&location, sampler_elem, sampler);
    }

    /// Bind a sub-range of a constant buffer; a `size` of 0 binds up to the end of the buffer
    pub fn set_buffer_range(&self, object: Option<DeviceObject>, offset: u64, size: u64, elem: u32) -> bool {
        let desc = self.resource_desc();
        if desc.resource_type != ShaderResourceType::ConstantBuffer {
            crate::engine_error!(
                "galaxy3d::ShaderVariable",
                "SetBufferRange is only allowed for constant buffers; '{}' is a {}",
                desc.name,
                desc.resource_type.name()
            );
            return false;
        }
        if !self.check_array_index(elem, 1) {
            return false;
        }
        if let Some(buffer) = object.as_ref().and_then(|o| o.as_buffer()) {
            let buffer_size = buffer.desc().size;
            let end = if size == 0 { offset } else { offset.saturating_add(size) };
            if offset >= buffer_size || end > buffer_size {
                crate::engine_error!(
                    "galaxy3d::ShaderVariable",
                    "Range [{}, {}) is outside of buffer '{}' ({} bytes) bound to '{}'",
                    offset,
                    offset.saturating_add(size),
                    buffer.desc().name,
                    buffer_size,
                    desc.name
                );
                return false;
            }
        }

        let mut cache = lock_cache(self.cache);
        let Some(location) = self.location_of(self.attribs()) else {
            return false;
        };
        let current = cache.get_object(&location, elem);
        let target = BindTarget {
            signature: self.signature.name(),
            desc,
            elem,
        };
        if !verify_resource_binding(&target, object.as_ref(), current.as_ref(), false) {
            return false;
        }
        cache.set_buffer_range(&location, elem, object, offset, size);
        true
    }

    /// Set the dynamic offset of element `elem`; the buffer stays bound
    pub fn set_buffer_offset(&self, offset: u32, elem: u32) -> bool {
        let desc = self.resource_desc();
        let buffer_type = matches!(
            desc.resource_type,
            ShaderResourceType::ConstantBuffer | ShaderResourceType::BufferSrv | ShaderResourceType::BufferUav
        );
        if !buffer_type
            || desc.flags.intersects(PipelineResourceFlags::NO_DYNAMIC_BUFFERS | PipelineResourceFlags::FORMATTED_BUFFER)
            || desc.var_type == VariableType::Static
        {
            crate::engine_error!(
                "galaxy3d::ShaderVariable",
                "SetBufferOffset is not allowed for {} variable '{}' ({}, flags {:?}): it requires a non-static, non-formatted buffer variable without NO_DYNAMIC_BUFFERS",
                desc.var_type.name(),
                desc.name,
                desc.resource_type.name(),
                desc.flags
            );
            return false;
        }
        if !self.check_array_index(elem, 1) {
            return false;
        }
        let Some(location) = self.location_of(self.attribs()) else {
            return false;
        };
        lock_cache(self.cache).set_dynamic_offset(&location, elem, offset);
        true
    }
}

#[cfg(test)]
#[path = "variable_tests.rs"]
mod tests;
