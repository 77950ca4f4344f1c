//! Immediate device context
//!
//! Owns one command recorder and tracks the pipeline state and SRBs committed into
//! it. Draws and dispatches are refused when the committed SRBs do not cover the
//! pipeline's signatures.

use std::sync::Arc;

use crate::binding::{
    BindingModel, PipelineType, ShaderResourceBinding, StateTransitionMode, MAX_RESOURCE_SIGNATURES,
};
use crate::config::Config;
use crate::device::{
    CommandQueue, CommandRecorder, DispatchAttribs, DrawAttribs, DrawIndexedAttribs, ReleaseQueue, RenderDevice,
    StaleObject,
};
use crate::error::Result;
use crate::pipeline::PipelineState;

/// Counters of what a context recorded
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContextStats {
    pub draws: u64,
    pub dispatches: u64,
    /// Draws and dispatches refused because of missing or mismatched bindings
    pub skipped: u64,
    pub commits: u64,
    pub barriers: u64,
}

pub struct DeviceContext<B: BindingModel> {
    name: String,
    device: Arc<dyn RenderDevice>,
    recorder: Box<dyn CommandRecorder>,
    queue: Arc<dyn CommandQueue>,
    release_queue: Arc<ReleaseQueue>,
    recording: bool,
    pipeline: Option<Arc<PipelineState<B>>>,
    /// Pipeline states bound since the last flush
    used_pipelines: Vec<Arc<PipelineState<B>>>,
    committed: [Option<Arc<ShaderResourceBinding<B>>>; MAX_RESOURCE_SIGNATURES as usize],
    dev_validation: bool,
    stats: ContextStats,
}

impl<B: BindingModel> DeviceContext<B> {
    pub fn new(name: impl Into<String>, device: Arc<dyn RenderDevice>, config: &Config) -> Result<Self> {
        let name = name.into();
        let recorder = device.create_command_recorder()?;
        let queue = device.command_queue();
        let release_queue = device.release_queue();
        crate::engine_debug!(
            "galaxy3d::DeviceContext",
            "Created context '{}' ({} binding model, validation {})",
            name,
            B::NAME,
            if config.enable_validation { "on" } else { "off" }
        );
        Ok(Self {
            name,
            device,
            recorder,
            queue,
            release_queue,
            recording: false,
            pipeline: None,
            used_pipelines: Vec::new(),
            committed: Default::default(),
            dev_validation: config.enable_validation,
            stats: ContextStats::default(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn device(&self) -> &Arc<dyn RenderDevice> {
        &self.device
    }

    pub fn stats(&self) -> ContextStats {
        self.stats
    }

    pub fn pipeline_state(&self) -> Option<&Arc<PipelineState<B>>> {
        self.pipeline.as_ref()
    }

    /// SRB committed at `binding_index` since the last `set_pipeline_state`
    pub fn committed_srb(&self, binding_index: u8) -> Option<&Arc<ShaderResourceBinding<B>>> {
        self.committed.get(binding_index as usize).and_then(Option::as_ref)
    }

    // ===== RECORDING =====

    /// Start recording; does nothing when already recording
    pub fn begin(&mut self) -> Result<()> {
        if !self.recording {
            self.recorder.begin()?;
            self.recording = true;
        }
        Ok(())
    }

    pub fn set_pipeline_state(&mut self, pipeline: &Arc<PipelineState<B>>) {
        self.recorder.bind_pipeline(pipeline.native().as_ref());
        if !self.used_pipelines.iter().any(|used| Arc::ptr_eq(used, pipeline)) {
            self.used_pipelines.push(pipeline.clone());
        }
        self.pipeline = Some(pipeline.clone());
        self.committed = Default::default();
    }

    /// Commit `srb` with the current pipeline state
    pub fn commit_shader_resources(&mut self, srb: &Arc<ShaderResourceBinding<B>>, mode: StateTransitionMode) -> bool {
        let Some(pipeline) = self.pipeline.as_ref() else {
            crate::engine_error!(
                "galaxy3d::DeviceContext",
                "Context '{}': no pipeline state is set; SRB of signature '{}' can not be committed",
                self.name,
                srb.signature().name()
            );
            return false;
        };
        match pipeline.commit(self.recorder.as_mut(), srb, mode, self.dev_validation) {
            Some(info) => {
                self.stats.commits += 1;
                self.stats.barriers += info.barriers as u64;
                self.committed[srb.binding_index() as usize] = Some(srb.clone());
                true
            }
            None => false,
        }
    }

    pub fn transition_shader_resources(&mut self, pipeline: &PipelineState<B>, srb: &ShaderResourceBinding<B>) {
        let barriers = pipeline.transition_shader_resources(self.recorder.as_mut(), srb);
        self.stats.barriers += barriers as u64;
    }

    /// Whether the current state allows a draw or dispatch of `pipeline_type`
    fn check_bindings(&self, pipeline_type: PipelineType, command: &str) -> bool {
        let Some(pipeline) = self.pipeline.as_ref() else {
            crate::engine_error!(
                "galaxy3d::DeviceContext",
                "Context '{}': {} skipped, no pipeline state is set",
                self.name,
                command
            );
            return false;
        };
        if pipeline.pipeline_type() != pipeline_type {
            crate::engine_error!(
                "galaxy3d::DeviceContext",
                "Context '{}': {} skipped, pipeline state '{}' is a {:?} pipeline",
                self.name,
                command,
                pipeline.name(),
                pipeline.pipeline_type()
            );
            return false;
        }

        let mut ok = true;
        for index in 0..pipeline.signature_count() as u8 {
            let Some(signature) = pipeline.signature(index) else {
                continue;
            };
            if signature.is_empty() {
                continue;
            }
            match self.committed_srb(index) {
                None => {
                    crate::engine_error!(
                        "galaxy3d::DeviceContext",
                        "Context '{}': {} skipped, no SRB is committed for signature '{}' (binding index {}) of pipeline state '{}'",
                        self.name,
                        command,
                        signature.name(),
                        index,
                        pipeline.name()
                    );
                    ok = false;
                }
                Some(srb) if !signature.is_compatible_with(srb.signature()) => {
                    crate::engine_error!(
                        "galaxy3d::DeviceContext",
                        "Context '{}': {} skipped, the SRB committed at binding index {} (signature '{}') is not compatible with signature '{}' of pipeline state '{}'",
                        self.name,
                        command,
                        index,
                        srb.signature().name(),
                        signature.name(),
                        pipeline.name()
                    );
                    ok = false;
                }
                Some(_) => {}
            }
        }
        ok
    }

    pub fn draw(&mut self, attribs: &DrawAttribs) {
        if !self.check_bindings(PipelineType::Graphics, "Draw") {
            self.stats.skipped += 1;
            return;
        }
        self.recorder.draw(attribs);
        self.stats.draws += 1;
    }

    pub fn draw_indexed(&mut self, attribs: &DrawIndexedAttribs) {
        if !self.check_bindings(PipelineType::Graphics, "DrawIndexed") {
            self.stats.skipped += 1;
            return;
        }
        self.recorder.draw_indexed(attribs);
        self.stats.draws += 1;
    }

    pub fn dispatch(&mut self, attribs: &DispatchAttribs) {
        if !self.check_bindings(PipelineType::Compute, "Dispatch") {
            self.stats.skipped += 1;
            return;
        }
        self.recorder.dispatch(attribs);
        self.stats.dispatches += 1;
    }

    // ===== SUBMISSION AND RELEASE =====

    /// Submit what was recorded and start a new recording
    ///
    /// Returns the fence value of the submission. The pipeline states bound since the
    /// last flush and the objects the recorder hands back (retired sets, resources
    /// referenced by bound sets) are released once that fence completes.
    pub fn flush(&mut self) -> Result<u64> {
        self.begin()?;
        self.recorder.end()?;
        self.recording = false;
        let fence = self.queue.submit(self.recorder.as_mut())?;
        for object in self.recorder.take_stale_objects() {
            self.release_queue.defer_release(fence, object);
        }
        if !self.used_pipelines.is_empty() {
            self.release_queue.defer_release(fence, Box::new(std::mem::take(&mut self.used_pipelines)));
        }
        self.pipeline = None;
        self.committed = Default::default();
        self.begin()?;
        Ok(fence)
    }

    /// Keep `object` alive until everything submitted so far has completed
    pub fn release_object(&self, object: StaleObject) {
        self.release_queue.defer_release(self.queue.next_fence_value(), object);
    }

    /// Drop the objects whose submissions completed; returns how many were released
    pub fn finish_frame(&self) -> usize {
        self.release_queue.purge(self.queue.completed_fence_value())
    }

    pub fn wait_for_idle(&self) -> Result<()> {
        self.queue.wait_idle()?;
        self.release_queue.release_all();
        Ok(())
    }
}

impl<B: BindingModel> Drop for DeviceContext<B> {
    fn drop(&mut self) {
        if let Err(err) = self.wait_for_idle() {
            crate::engine_error!("galaxy3d::DeviceContext", "Context '{}': wait for idle failed: {}", self.name, err);
        }
    }
}

#[cfg(test)]
#[path = "device_context_tests.rs"]
mod tests;
