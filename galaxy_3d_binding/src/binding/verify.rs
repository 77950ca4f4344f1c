//! Bind-time checks of objects against the variables they are bound to
//!
//! Every check reports its failure through `engine_error!` and returns `false`;
//! a refused binding leaves the cache untouched.

use crate::binding::resource_desc::{PipelineResourceDesc, PipelineResourceFlags, ShaderResourceType, VariableType};
use crate::device::{
    BindFlags, BufferMode, BufferViewType, DeviceObject, DeviceObjectKind, ResourceDimension, TextureViewType, Usage,
};

/// The variable element an object is being bound to
pub(crate) struct BindTarget<'a> {
    pub signature: &'a str,
    pub desc: &'a PipelineResourceDesc,
    pub elem: u32,
}

impl BindTarget<'_> {
    fn variable_name(&self) -> String {
        if self.desc.array_size > 1 {
            format!("{}[{}]", self.desc.name, self.elem)
        } else {
            self.desc.name.clone()
        }
    }

    fn report(&self, object: Option<&DeviceObject>, reason: std::fmt::Arguments<'_>) {
        let object = object.map(|o| format!("'{}'", o.name())).unwrap_or_else(|| "null".to_string());
        crate::engine_error!(
            "galaxy3d::ShaderVariable",
            "Failed to bind {} to variable '{}' in signature '{}': {}",
            object,
            self.variable_name(),
            self.signature,
            reason
        );
    }
}

/// Device object kind a resource type accepts
pub(crate) fn expected_kind(resource_type: ShaderResourceType) -> DeviceObjectKind {
    match resource_type {
        ShaderResourceType::ConstantBuffer => DeviceObjectKind::Buffer,
        ShaderResourceType::TextureSrv | ShaderResourceType::TextureUav | ShaderResourceType::InputAttachment => {
            DeviceObjectKind::TextureView
        }
        ShaderResourceType::BufferSrv | ShaderResourceType::BufferUav => DeviceObjectKind::BufferView,
        ShaderResourceType::Sampler => DeviceObjectKind::Sampler,
        ShaderResourceType::AccelStruct => DeviceObjectKind::Tlas,
    }
}

/// Run every bind-time check for `object`
///
/// `current` is the object already bound to the element.
pub(crate) fn verify_resource_binding(
    target: &BindTarget<'_>,
    object: Option<&DeviceObject>,
    current: Option<&DeviceObject>,
    allow_overwrite: bool,
) -> bool {
    if let Some(obj) = object {
        let expected = expected_kind(target.desc.resource_type);
        if obj.kind() != expected {
            target.report(
                object,
                format_args!("a {} variable expects a {:?}, got a {:?}", target.desc.resource_type.name(), expected, obj.kind()),
            );
            return false;
        }
        let valid = match target.desc.resource_type {
            ShaderResourceType::ConstantBuffer => verify_constant_buffer(target, obj),
            ShaderResourceType::TextureSrv | ShaderResourceType::TextureUav | ShaderResourceType::InputAttachment => {
                verify_texture_view(target, obj, None)
            }
            ShaderResourceType::BufferSrv | ShaderResourceType::BufferUav => verify_buffer_view(target, obj),
            ShaderResourceType::Sampler | ShaderResourceType::AccelStruct => true,
        };
        if !valid {
            return false;
        }
    }

    if target.desc.var_type != VariableType::Dynamic && !allow_overwrite {
        if let Some(bound) = current {
            let same = object.is_some_and(|obj| obj.ptr_eq(bound));
            if !same {
                target.report(
                    object,
                    format_args!(
                        "the {} variable is already bound to '{}'; use a dynamic variable or allow overwrites to rebind it",
                        target.desc.var_type.name(),
                        bound.name()
                    ),
                );
                return false;
            }
        }
    }
    true
}

pub(crate) fn verify_constant_buffer(target: &BindTarget<'_>, object: &DeviceObject) -> bool {
    let Some(buffer) = object.as_buffer() else {
        return false;
    };
    let desc = buffer.desc();
    if !desc.bind_flags.contains(BindFlags::UNIFORM_BUFFER) {
        target.report(Some(object), format_args!("the buffer was not created with the UNIFORM_BUFFER bind flag"));
        return false;
    }
    if desc.usage == Usage::Dynamic && target.desc.flags.contains(PipelineResourceFlags::NO_DYNAMIC_BUFFERS) {
        target.report(
            Some(object),
            format_args!("dynamic buffers are not allowed for a variable flagged NO_DYNAMIC_BUFFERS"),
        );
        return false;
    }
    true
}

/// Check the view type, and the dimension/multisampling when the shader's expectation is known
pub(crate) fn verify_texture_view(
    target: &BindTarget<'_>,
    object: &DeviceObject,
    expected: Option<(ResourceDimension, bool)>,
) -> bool {
    let Some(view) = object.as_texture_view() else {
        return false;
    };
    let required = match target.desc.resource_type {
        ShaderResourceType::TextureUav => TextureViewType::UnorderedAccess,
        _ => TextureViewType::ShaderResource,
    };
    let view_type = view.desc().view_type;
    if view_type != required {
        target.report(Some(object), format_args!("expected a {:?} view, got a {:?} view", required, view_type));
        return false;
    }

    if let Some((dimension, multisample)) = expected {
        let actual = view.resolved_dimension();
        if dimension != ResourceDimension::Undefined && actual != dimension {
            target.report(Some(object), format_args!("the shader expects a {:?} texture, got {:?}", dimension, actual));
            return false;
        }
        let is_multisample = view.texture().desc().sample_count > 1;
        if is_multisample != multisample {
            target.report(
                Some(object),
                format_args!(
                    "the shader expects a {} texture",
                    if multisample { "multisampled" } else { "single-sampled" }
                ),
            );
            return false;
        }
    }
    true
}

pub(crate) fn verify_buffer_view(target: &BindTarget<'_>, object: &DeviceObject) -> bool {
    let Some(view) = object.as_buffer_view() else {
        return false;
    };
    let required = match target.desc.resource_type {
        ShaderResourceType::BufferUav => BufferViewType::UnorderedAccess,
        _ => BufferViewType::ShaderResource,
    };
    if view.desc().view_type != required {
        target.report(
            Some(object),
            format_args!("expected a {:?} view, got a {:?} view", required, view.desc().view_type),
        );
        return false;
    }

    let mode = view.buffer().desc().mode;
    if target.desc.flags.contains(PipelineResourceFlags::FORMATTED_BUFFER) {
        if mode != BufferMode::Formatted {
            target.report(Some(object), format_args!("a formatted buffer is required, got a {:?} buffer", mode));
            return false;
        }
    } else if mode != BufferMode::Structured && mode != BufferMode::Raw {
        target.report(Some(object), format_args!("a structured or raw buffer is required, got a {:?} buffer", mode));
        return false;
    }
    true
}

#[cfg(test)]
#[path = "verify_tests.rs"]
mod tests;
