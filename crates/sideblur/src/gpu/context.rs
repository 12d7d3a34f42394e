use crate::error::EffectError;
use crate::types::{GpuPowerPreference, ShaderCompiler};

/// Knobs for creating a headless context.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GpuOptions {
    pub power: GpuPowerPreference,
    pub compiler: ShaderCompiler,
}

/// Summary of the adapter backing a context, used for logging.
#[derive(Debug, Clone)]
pub struct AdapterProfile {
    pub name: String,
    pub backend: wgpu::Backend,
    pub device_type: wgpu::DeviceType,
    pub min_uniform_buffer_offset_alignment: u32,
}

impl AdapterProfile {
    fn from_wgpu(info: &wgpu::AdapterInfo, limits: &wgpu::Limits) -> Self {
        Self {
            name: info.name.clone(),
            backend: info.backend,
            device_type: info.device_type,
            min_uniform_buffer_offset_alignment: limits.min_uniform_buffer_offset_alignment,
        }
    }

    pub fn is_software(&self) -> bool {
        matches!(self.device_type, wgpu::DeviceType::Cpu)
    }
}

/// Device and queue the effect records into.
///
/// Hosts that already own a device wrap it with [`GpuContext::from_device`];
/// offline hosts and tests create one with [`GpuContext::headless`].
#[derive(Debug, Clone)]
pub struct GpuContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    compiler: ShaderCompiler,
    adapter_profile: Option<AdapterProfile>,
}

impl GpuContext {
    pub fn from_device(device: wgpu::Device, queue: wgpu::Queue, compiler: ShaderCompiler) -> Self {
        Self {
            device,
            queue,
            compiler,
            adapter_profile: None,
        }
    }

    /// Creates an instance, adapter, and device with no presentation surface.
    pub fn headless(options: GpuOptions) -> Result<Self, EffectError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            flags: wgpu::InstanceFlags::default(),
            memory_budget_thresholds: wgpu::MemoryBudgetThresholds::default(),
            backend_options: wgpu::BackendOptions::default(),
        });

        let power_preference = match options.power {
            GpuPowerPreference::Low => wgpu::PowerPreference::LowPower,
            GpuPowerPreference::High => wgpu::PowerPreference::HighPerformance,
        };
        let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
            power_preference,
            compatible_surface: None,
            force_fallback_adapter: false,
        }))
        .map_err(|err| EffectError::Gpu(format!("failed to find a suitable GPU adapter: {err}")))?;

        let limits = adapter.limits();
        let profile = AdapterProfile::from_wgpu(&adapter.get_info(), &limits);
        tracing::debug!(
            name = %profile.name,
            backend = ?profile.backend,
            device_type = ?profile.device_type,
            is_software = profile.is_software(),
            "selected GPU adapter"
        );

        let (device, queue) = pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
            label: Some("sideblur device"),
            required_features: wgpu::Features::empty(),
            required_limits: limits,
            memory_hints: wgpu::MemoryHints::MemoryUsage,
            trace: wgpu::Trace::default(),
        }))
        .map_err(|err| EffectError::Gpu(format!("failed to create GPU device: {err}")))?;

        Ok(Self {
            device,
            queue,
            compiler: options.compiler,
            adapter_profile: Some(profile),
        })
    }

    pub fn compiler(&self) -> ShaderCompiler {
        self.compiler
    }

    pub fn adapter_profile(&self) -> Option<&AdapterProfile> {
        self.adapter_profile.as_ref()
    }

    /// Blocks until all submitted work has finished.
    pub fn wait_idle(&self) -> Result<(), EffectError> {
        self.device
            .poll(wgpu::PollType::Wait)
            .map(|_| ())
            .map_err(EffectError::gpu)
    }
}
