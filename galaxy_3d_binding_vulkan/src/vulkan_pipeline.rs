/// VulkanPipeline - Vulkan implementation of the NativePipeline trait
///
/// Owns one descriptor set layout per signature table, the pipeline layout and
/// the pipeline. Graphics pipelines use dynamic rendering and take no vertex
/// input: vertices are fetched from bound buffers.

use ash::vk;
use ash::vk::Handle;
use galaxy_3d_binding::galaxy3d::binding::PipelineType;
use galaxy_3d_binding::galaxy3d::device::{NativeHandle, NativePipeline, NativePipelineInfo};
use galaxy_3d_binding::galaxy3d::pipeline::Shader;
use galaxy_3d_binding::galaxy3d::Result;
use galaxy_3d_binding::{engine_bail, engine_debug, engine_err};
use std::any::Any;
use std::sync::Arc;

use crate::vulkan_context::GpuContext;
use crate::vulkan_format::{layout_bindings, shader_stage_to_vk};

/// Color format of the render targets graphics pipelines are built for
pub const RENDER_TARGET_FORMAT: vk::Format = vk::Format::R8G8B8A8_UNORM;

pub struct VulkanPipeline {
    ctx: Arc<GpuContext>,
    name: String,
    pipeline_type: PipelineType,
    pub(crate) set_layouts: Vec<vk::DescriptorSetLayout>,
    pub(crate) pipeline_layout: vk::PipelineLayout,
    pub(crate) pipeline: vk::Pipeline,
}

impl VulkanPipeline {
    pub(crate) fn create(ctx: Arc<GpuContext>, info: &NativePipelineInfo<'_>) -> Result<Self> {
        // Partially built pipeline, destroyed by Drop if a later step fails
        let mut pipeline = Self {
            ctx,
            name: info.name.to_string(),
            pipeline_type: info.pipeline_type,
            set_layouts: Vec::with_capacity(info.layout.sets.len()),
            pipeline_layout: vk::PipelineLayout::null(),
            pipeline: vk::Pipeline::null(),
        };
        let device = &pipeline.ctx.device;

        if info.layout.sets.len() as u32 > pipeline.ctx.limits.max_bound_descriptor_sets {
            engine_bail!(
                "galaxy3d::vulkan",
                "Pipeline '{}' uses {} descriptor sets, the device supports {}",
                info.name,
                info.layout.sets.len(),
                pipeline.ctx.limits.max_bound_descriptor_sets
            );
        }

        unsafe {
            for (set_index, set) in info.layout.sets.iter().enumerate() {
                let bindings = layout_bindings(set);
                let vk_bindings: Vec<vk::DescriptorSetLayoutBinding<'_>> = bindings.iter().map(|b| b.to_vk()).collect();
                let layout_info = vk::DescriptorSetLayoutCreateInfo::default().bindings(&vk_bindings);
                let layout = device.create_descriptor_set_layout(&layout_info, None).map_err(|e| {
                    engine_err!(
                        "galaxy3d::vulkan",
                        "Failed to create descriptor set layout {} of pipeline '{}': {:?}",
                        set_index,
                        info.name,
                        e
                    )
                })?;
                pipeline.set_layouts.push(layout);
            }

            let layout_info = vk::PipelineLayoutCreateInfo::default().set_layouts(&pipeline.set_layouts);
            pipeline.pipeline_layout = device.create_pipeline_layout(&layout_info, None).map_err(|e| {
                engine_err!("galaxy3d::vulkan", "Failed to create layout of pipeline '{}': {:?}", info.name, e)
            })?;

            let modules = create_shader_modules(device, info.shaders)?;
            let result = match info.pipeline_type {
                PipelineType::Compute => create_compute_pipeline(device, info, &modules, pipeline.pipeline_layout),
                PipelineType::Graphics => create_graphics_pipeline(device, info, &modules, pipeline.pipeline_layout),
            };
            for (_, module) in &modules {
                device.destroy_shader_module(*module, None);
            }
            pipeline.pipeline = result?;
        }

        engine_debug!(
            "galaxy3d::vulkan",
            "Created {:?} pipeline '{}' with {} descriptor sets",
            pipeline.pipeline_type,
            pipeline.name,
            pipeline.set_layouts.len()
        );
        Ok(pipeline)
    }

    pub fn bind_point(&self) -> vk::PipelineBindPoint {
        match self.pipeline_type {
            PipelineType::Graphics => vk::PipelineBindPoint::GRAPHICS,
            PipelineType::Compute => vk::PipelineBindPoint::COMPUTE,
        }
    }

    pub fn set_layout(&self, set_index: u32) -> Option<vk::DescriptorSetLayout> {
        self.set_layouts.get(set_index as usize).copied()
    }
}

unsafe fn create_shader_modules(
    device: &ash::Device,
    shaders: &[Arc<Shader>],
) -> Result<Vec<(vk::ShaderStageFlags, vk::ShaderModule)>> {
    let mut modules = Vec::with_capacity(shaders.len());
    for shader in shaders {
        let module_info = vk::ShaderModuleCreateInfo::default().code(shader.bytecode().code());
        match device.create_shader_module(&module_info, None) {
            Ok(module) => modules.push((shader_stage_to_vk(shader.stage()), module)),
            Err(e) => {
                for (_, module) in &modules {
                    device.destroy_shader_module(*module, None);
                }
                return Err(engine_err!(
                    "galaxy3d::vulkan",
                    "Failed to create shader module '{}': {:?}",
                    shader.name(),
                    e
                ));
            }
        }
    }
    Ok(modules)
}

fn stage_infos(modules: &[(vk::ShaderStageFlags, vk::ShaderModule)]) -> Vec<vk::PipelineShaderStageCreateInfo<'static>> {
    modules
        .iter()
        .map(|(stage, module)| {
            vk::PipelineShaderStageCreateInfo::default()
                .stage(*stage)
                .module(*module)
                .name(c"main")
        })
        .collect()
}

unsafe fn create_compute_pipeline(
    device: &ash::Device,
    info: &NativePipelineInfo<'_>,
    modules: &[(vk::ShaderStageFlags, vk::ShaderModule)],
    layout: vk::PipelineLayout,
) -> Result<vk::Pipeline> {
    let stages = stage_infos(modules);
    let Some(stage) = stages.first() else {
        engine_bail!("galaxy3d::vulkan", "Compute pipeline '{}' has no shader", info.name);
    };
    let create_info = vk::ComputePipelineCreateInfo::default().stage(*stage).layout(layout);
    device
        .create_compute_pipelines(vk::PipelineCache::null(), &[create_info], None)
        .map(|pipelines| pipelines[0])
        .map_err(|(_, e)| engine_err!("galaxy3d::vulkan", "Failed to create compute pipeline '{}': {:?}", info.name, e))
}

unsafe fn create_graphics_pipeline(
    device: &ash::Device,
    info: &NativePipelineInfo<'_>,
    modules: &[(vk::ShaderStageFlags, vk::ShaderModule)],
    layout: vk::PipelineLayout,
) -> Result<vk::Pipeline> {
    let stages = stage_infos(modules);

    let vertex_input = vk::PipelineVertexInputStateCreateInfo::default();
    let input_assembly = vk::PipelineInputAssemblyStateCreateInfo::default()
        .topology(vk::PrimitiveTopology::TRIANGLE_LIST)
        .primitive_restart_enable(false);
    let viewport_state = vk::PipelineViewportStateCreateInfo::default()
        .viewport_count(1)
        .scissor_count(1);
    let rasterizer = vk::PipelineRasterizationStateCreateInfo::default()
        .polygon_mode(vk::PolygonMode::FILL)
        .line_width(1.0)
        .cull_mode(vk::CullModeFlags::NONE)
        .front_face(vk::FrontFace::COUNTER_CLOCKWISE);
    let multisampling = vk::PipelineMultisampleStateCreateInfo::default()
        .rasterization_samples(vk::SampleCountFlags::TYPE_1);

    let blend_attachments: Vec<vk::PipelineColorBlendAttachmentState> = (0..info.num_render_targets)
        .map(|_| {
            vk::PipelineColorBlendAttachmentState::default()
                .color_write_mask(vk::ColorComponentFlags::RGBA)
                .blend_enable(false)
        })
        .collect();
    let color_blending = vk::PipelineColorBlendStateCreateInfo::default().attachments(&blend_attachments);

    let dynamic_states = [vk::DynamicState::VIEWPORT, vk::DynamicState::SCISSOR];
    let dynamic_state = vk::PipelineDynamicStateCreateInfo::default().dynamic_states(&dynamic_states);

    let color_formats = vec![RENDER_TARGET_FORMAT; info.num_render_targets as usize];
    let mut rendering_info = vk::PipelineRenderingCreateInfo::default().color_attachment_formats(&color_formats);

    let create_info = vk::GraphicsPipelineCreateInfo::default()
        .stages(&stages)
        .vertex_input_state(&vertex_input)
        .input_assembly_state(&input_assembly)
        .viewport_state(&viewport_state)
        .rasterization_state(&rasterizer)
        .multisample_state(&multisampling)
        .color_blend_state(&color_blending)
        .dynamic_state(&dynamic_state)
        .layout(layout)
        .push_next(&mut rendering_info);

    device
        .create_graphics_pipelines(vk::PipelineCache::null(), &[create_info], None)
        .map(|pipelines| pipelines[0])
        .map_err(|(_, e)| engine_err!("galaxy3d::vulkan", "Failed to create graphics pipeline '{}': {:?}", info.name, e))
}

impl NativePipeline for VulkanPipeline {
    fn name(&self) -> &str {
        &self.name
    }

    fn pipeline_type(&self) -> PipelineType {
        self.pipeline_type
    }

    fn native_handle(&self) -> NativeHandle {
        NativeHandle(self.pipeline.as_raw())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for VulkanPipeline {
    fn drop(&mut self) {
        unsafe {
            if self.pipeline != vk::Pipeline::null() {
                self.ctx.device.destroy_pipeline(self.pipeline, None);
            }
            if self.pipeline_layout != vk::PipelineLayout::null() {
                self.ctx.device.destroy_pipeline_layout(self.pipeline_layout, None);
            }
            for layout in self.set_layouts.drain(..) {
                self.ctx.device.destroy_descriptor_set_layout(layout, None);
            }
        }
    }
}
