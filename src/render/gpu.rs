use std::sync::{Arc, mpsc};

use crate::effects::blur::{kernel_reach, sigma_for_radius};
use crate::foundation::core::{FilterKind, FilterParameter, PixelBuffer, PixelFormat};
use crate::foundation::error::{FilterError, FilterResult};
use crate::render::backend::{BackendSettings, FilterBackend};
use crate::render::slots::OutputSlots;

const TARGET_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::Rgba8Unorm;

const FULLSCREEN_VS: &str = r#"
struct VsOut {
  @builtin(position) pos: vec4<f32>,
  @location(0) uv: vec2<f32>,
};

@vertex
fn vs(@builtin(vertex_index) vi: u32) -> VsOut {
  var p = array<vec2<f32>, 3>(
    vec2<f32>(-1.0, -1.0),
    vec2<f32>( 3.0, -1.0),
    vec2<f32>(-1.0,  3.0),
  );
  let pos = p[vi];
  var o: VsOut;
  o.pos = vec4<f32>(pos, 0.0, 1.0);
  o.uv = vec2<f32>((pos.x + 1.0) * 0.5, (1.0 - pos.y) * 0.5);
  return o;
}
"#;

const DOWNSAMPLE_FS: &str = r#"
@group(0) @binding(0) var t_src: texture_2d<f32>;
@group(0) @binding(1) var s_src: sampler;

@fragment
fn fs(in: VsOut) -> @location(0) vec4<f32> {
  return textureSample(t_src, s_src, in.uv);
}
"#;

// params: x = sigma, y = reach in texels, zw = unit step direction.
const BLUR_FS: &str = r#"
@group(0) @binding(0) var t_src: texture_2d<f32>;
@group(0) @binding(1) var<uniform> params: vec4<f32>;

@fragment
fn fs(in: VsOut) -> @location(0) vec4<f32> {
  let dims = vec2<i32>(textureDimensions(t_src));
  let center = vec2<i32>(in.pos.xy);
  let reach = i32(params.y);
  let step = vec2<i32>(i32(params.z), i32(params.w));
  let denom = max(2.0 * params.x * params.x, 1e-6);
  var acc = vec4<f32>(0.0);
  var wsum = 0.0;
  for (var i = -reach; i <= reach; i = i + 1) {
    let p = clamp(center + step * i, vec2<i32>(0, 0), dims - vec2<i32>(1, 1));
    let w = exp(-f32(i * i) / denom);
    acc = acc + textureLoad(t_src, p, 0) * w;
    wsum = wsum + w;
  }
  return acc / wsum;
}
"#;

struct SlotTarget {
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    readback: wgpu::Buffer,
}

struct BlurPipeline {
    downsample: wgpu::RenderPipeline,
    blur: wgpu::RenderPipeline,
    downsample_bg: wgpu::BindGroup,
    blur_h_bg: wgpu::BindGroup,
    blur_v_bg: wgpu::BindGroup,
    blur_h_params: wgpu::Buffer,
    blur_v_params: wgpu::Buffer,
    small_view: wgpu::TextureView,
    scratch_view: wgpu::TextureView,
    _input: wgpu::Texture,
    _small: wgpu::Texture,
    _scratch: wgpu::Texture,
}

struct Configured {
    device: wgpu::Device,
    queue: wgpu::Queue,
    pipeline: BlurPipeline,
    targets: Vec<SlotTarget>,
    outputs: OutputSlots,
    out_width: u32,
    out_height: u32,
    readback_bytes_per_row: u32,
}

/// Compositing-pipeline backend on wgpu: downsample, then a two-pass clamped Gaussian blur.
///
/// The pipeline, bind groups and per-slot render targets are built once in `configure`; `apply`
/// only rewrites the blur uniforms, submits, and waits for the frame to land in the slot's
/// readback buffer.
pub struct GpuBackend {
    settings: BackendSettings,
    state: Option<Configured>,
}

impl GpuBackend {
    /// Create an unconfigured backend. No GPU work happens until `configure`.
    pub fn new(settings: BackendSettings) -> FilterResult<Self> {
        if settings.downsample_factor == 0 {
            return Err(FilterError::validation("downsample_factor must be >= 1"));
        }
        Ok(Self {
            settings,
            state: None,
        })
    }

    /// Output dimensions for an input of `width` x `height`.
    pub fn output_size(&self, width: u32, height: u32) -> (u32, u32) {
        let f = self.settings.downsample_factor.max(1);
        ((width / f).max(1), (height / f).max(1))
    }
}

impl FilterBackend for GpuBackend {
    fn name(&self) -> &'static str {
        "gpu"
    }

    fn is_configured(&self) -> bool {
        self.state.is_some()
    }

    #[tracing::instrument(
        skip_all,
        fields(width = input.width, height = input.height, slot_count = slot_count)
    )]
    fn configure(&mut self, input: Arc<PixelBuffer>, slot_count: usize) -> FilterResult<()> {
        if self.state.is_some() {
            return Err(FilterError::invalid_state(
                "gpu backend configured twice without cleanup",
            ));
        }
        if input.format != PixelFormat::Rgba8 {
            return Err(FilterError::validation("gpu backend expects rgba8 input"));
        }

        let (device, queue) = request_device()?;
        let limit = device.limits().max_texture_dimension_2d;
        if input.width > limit || input.height > limit {
            return Err(FilterError::validation(format!(
                "input {}x{} exceeds the device texture limit {limit}",
                input.width, input.height
            )));
        }

        let (out_width, out_height) = self.output_size(input.width, input.height);
        let outputs =
            OutputSlots::allocate(slot_count, out_width, out_height, PixelFormat::Rgba8)?;

        let bytes_per_row_unpadded = out_width
            .checked_mul(4)
            .ok_or_else(|| FilterError::validation("render target width overflow"))?;
        let readback_bytes_per_row =
            align_to(bytes_per_row_unpadded, wgpu::COPY_BYTES_PER_ROW_ALIGNMENT);
        let readback_size = (readback_bytes_per_row as u64)
            .checked_mul(out_height as u64)
            .ok_or_else(|| FilterError::validation("readback buffer size overflow"))?;

        let pipeline = build_pipeline(&device, &queue, &input, out_width, out_height);
        let targets = (0..slot_count)
            .map(|i| {
                let texture = create_target(
                    &device,
                    "filterbench_slot",
                    out_width,
                    out_height,
                    wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
                );
                let view = texture.create_view(&wgpu::TextureViewDescriptor::default());
                let label = format!("filterbench_readback_{i}");
                let readback = device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some(label.as_str()),
                    size: readback_size,
                    usage: wgpu::BufferUsages::MAP_READ | wgpu::BufferUsages::COPY_DST,
                    mapped_at_creation: false,
                });
                SlotTarget {
                    texture,
                    view,
                    readback,
                }
            })
            .collect();

        tracing::debug!(out_width, out_height, "gpu pipeline built");
        self.state = Some(Configured {
            device,
            queue,
            pipeline,
            targets,
            outputs,
            out_width,
            out_height,
            readback_bytes_per_row,
        });
        Ok(())
    }

    fn apply(&mut self, param: FilterParameter, slot: usize) -> FilterResult<Arc<PixelBuffer>> {
        let state = self.state.as_mut().ok_or(FilterError::NotConfigured)?;
        let target = state.targets.get(slot).ok_or_else(|| {
            FilterError::validation(format!(
                "output slot {slot} out of range (count {})",
                state.targets.len()
            ))
        })?;

        match param.kind {
            FilterKind::Blur => {
                let sigma = sigma_for_radius(param.value);
                let reach = kernel_reach(sigma) as f32;
                let p = &state.pipeline;
                let h = blur_params(sigma, reach, [1.0, 0.0]);
                let v = blur_params(sigma, reach, [0.0, 1.0]);
                state.queue.write_buffer(&p.blur_h_params, 0, &h);
                state.queue.write_buffer(&p.blur_v_params, 0, &v);
            }
        }

        let p = &state.pipeline;
        let mut encoder = state
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("filterbench_apply_encoder"),
            });
        draw_fullscreen(
            &mut encoder,
            "filterbench_downsample",
            &p.small_view,
            &p.downsample,
            &p.downsample_bg,
        );
        draw_fullscreen(
            &mut encoder,
            "filterbench_blur_h",
            &p.scratch_view,
            &p.blur,
            &p.blur_h_bg,
        );
        draw_fullscreen(
            &mut encoder,
            "filterbench_blur_v",
            &target.view,
            &p.blur,
            &p.blur_v_bg,
        );
        encoder.copy_texture_to_buffer(
            wgpu::TexelCopyTextureInfo {
                texture: &target.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyBufferInfo {
                buffer: &target.readback,
                layout: wgpu::TexelCopyBufferLayout {
                    offset: 0,
                    bytes_per_row: Some(state.readback_bytes_per_row),
                    rows_per_image: Some(state.out_height),
                },
            },
            wgpu::Extent3d {
                width: state.out_width,
                height: state.out_height,
                depth_or_array_layers: 1,
            },
        );
        state.queue.submit(Some(encoder.finish()));

        let slice = target.readback.slice(..);
        let (tx, rx) = mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |res| {
            let _ = tx.send(res);
        });
        // Unmaps on every exit path below, including a failed or abandoned map.
        let _mapping = ReadbackGuard {
            buffer: &target.readback,
        };

        state
            .device
            .poll(wgpu::PollType::wait_indefinitely())
            .map_err(|e| FilterError::resource(format!("wgpu poll failed: {e:?}")))?;
        rx.recv()
            .map_err(|_| FilterError::resource("readback produced no frame"))?
            .map_err(|e| FilterError::resource(format!("readback map failed: {e:?}")))?;

        let mapped = slice.get_mapped_range();
        let out = state.outputs.write(slot)?;
        let row_bytes = out.row_bytes();
        let padded = state.readback_bytes_per_row as usize;
        for (row, dst) in out.data.chunks_exact_mut(row_bytes).enumerate() {
            let start = row * padded;
            let src = mapped.get(start..start + row_bytes).ok_or_else(|| {
                FilterError::resource("readback frame shorter than the output slot")
            })?;
            dst.copy_from_slice(src);
        }
        drop(mapped);

        state.outputs.publish(slot)
    }

    fn cleanup(&mut self) {
        if let Some(state) = self.state.take() {
            for target in &state.targets {
                target.readback.destroy();
                target.texture.destroy();
            }
            drop(state);
            tracing::debug!("gpu backend cleaned up");
        }
    }
}

impl Drop for GpuBackend {
    fn drop(&mut self) {
        self.cleanup();
    }
}

struct ReadbackGuard<'a> {
    buffer: &'a wgpu::Buffer,
}

impl Drop for ReadbackGuard<'_> {
    fn drop(&mut self) {
        self.buffer.unmap();
    }
}

fn request_device() -> FilterResult<(wgpu::Device, wgpu::Queue)> {
    let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor::default());
    let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
        power_preference: wgpu::PowerPreference::HighPerformance,
        compatible_surface: None,
        force_fallback_adapter: false,
    }))
    .map_err(|e| match e {
        wgpu::RequestAdapterError::NotFound { .. } => {
            FilterError::resource("no gpu adapter available")
        }
        other => FilterError::resource(format!("wgpu request_adapter failed: {other:?}")),
    })?;

    pollster::block_on(adapter.request_device(&wgpu::DeviceDescriptor {
        label: Some("filterbench_device"),
        required_features: wgpu::Features::empty(),
        required_limits: wgpu::Limits::default(),
        experimental_features: wgpu::ExperimentalFeatures::default(),
        memory_hints: wgpu::MemoryHints::Performance,
        trace: wgpu::Trace::Off,
    }))
    .map_err(|e| FilterError::resource(format!("wgpu request_device failed: {e:?}")))
}

fn build_pipeline(
    device: &wgpu::Device,
    queue: &wgpu::Queue,
    input: &PixelBuffer,
    out_width: u32,
    out_height: u32,
) -> BlurPipeline {
    let input_tex = device.create_texture(&wgpu::TextureDescriptor {
        label: Some("filterbench_input"),
        size: wgpu::Extent3d {
            width: input.width,
            height: input.height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: TARGET_FORMAT,
        usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
        view_formats: &[],
    });
    queue.write_texture(
        wgpu::TexelCopyTextureInfo {
            texture: &input_tex,
            mip_level: 0,
            origin: wgpu::Origin3d::ZERO,
            aspect: wgpu::TextureAspect::All,
        },
        &input.data,
        wgpu::TexelCopyBufferLayout {
            offset: 0,
            bytes_per_row: Some(input.width * 4),
            rows_per_image: Some(input.height),
        },
        wgpu::Extent3d {
            width: input.width,
            height: input.height,
            depth_or_array_layers: 1,
        },
    );
    let input_view = input_tex.create_view(&wgpu::TextureViewDescriptor::default());

    let intermediate =
        wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::TEXTURE_BINDING;
    let small = create_target(
        device,
        "filterbench_downsampled",
        out_width,
        out_height,
        intermediate,
    );
    let small_view = small.create_view(&wgpu::TextureViewDescriptor::default());
    let scratch = create_target(
        device,
        "filterbench_blur_scratch",
        out_width,
        out_height,
        intermediate,
    );
    let scratch_view = scratch.create_view(&wgpu::TextureViewDescriptor::default());

    let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
        label: Some("filterbench_downsample_sampler"),
        address_mode_u: wgpu::AddressMode::ClampToEdge,
        address_mode_v: wgpu::AddressMode::ClampToEdge,
        address_mode_w: wgpu::AddressMode::ClampToEdge,
        mag_filter: wgpu::FilterMode::Linear,
        min_filter: wgpu::FilterMode::Linear,
        mipmap_filter: wgpu::FilterMode::Nearest,
        ..Default::default()
    });

    let downsample_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("filterbench_downsample_bgl"),
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    view_dimension: wgpu::TextureViewDimension::D2,
                    sample_type: wgpu::TextureSampleType::Float { filterable: true },
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                count: None,
            },
        ],
    });
    let blur_bgl = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        label: Some("filterbench_blur_bgl"),
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    view_dimension: wgpu::TextureViewDimension::D2,
                    sample_type: wgpu::TextureSampleType::Float { filterable: false },
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: wgpu::BufferSize::new(16),
                },
                count: None,
            },
        ],
    });

    let downsample = create_fullscreen_pipeline(
        device,
        "filterbench_downsample",
        DOWNSAMPLE_FS,
        &downsample_bgl,
    );
    let blur = create_fullscreen_pipeline(device, "filterbench_blur", BLUR_FS, &blur_bgl);

    let downsample_bg = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("filterbench_downsample_bg"),
        layout: &downsample_bgl,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&input_view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(&sampler),
            },
        ],
    });

    let params_buffer = |label: &'static str| {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size: 16,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    };
    let blur_h_params = params_buffer("filterbench_blur_h_params");
    let blur_v_params = params_buffer("filterbench_blur_v_params");

    let blur_bind_group = |label: &'static str, src: &wgpu::TextureView, params: &wgpu::Buffer| {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(label),
            layout: &blur_bgl,
            entries: &[
                wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(src),
                },
                wgpu::BindGroupEntry {
                    binding: 1,
                    resource: params.as_entire_binding(),
                },
            ],
        })
    };
    let blur_h_bg = blur_bind_group("filterbench_blur_h_bg", &small_view, &blur_h_params);
    let blur_v_bg = blur_bind_group("filterbench_blur_v_bg", &scratch_view, &blur_v_params);

    BlurPipeline {
        downsample,
        blur,
        downsample_bg,
        blur_h_bg,
        blur_v_bg,
        blur_h_params,
        blur_v_params,
        small_view,
        scratch_view,
        _input: input_tex,
        _small: small,
        _scratch: scratch,
    }
}

fn create_target(
    device: &wgpu::Device,
    label: &str,
    width: u32,
    height: u32,
    usage: wgpu::TextureUsages,
) -> wgpu::Texture {
    device.create_texture(&wgpu::TextureDescriptor {
        label: Some(label),
        size: wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: TARGET_FORMAT,
        usage,
        view_formats: &[],
    })
}

fn create_fullscreen_pipeline(
    device: &wgpu::Device,
    label: &str,
    fragment_src: &str,
    bgl: &wgpu::BindGroupLayout,
) -> wgpu::RenderPipeline {
    let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
        label: Some(label),
        source: wgpu::ShaderSource::Wgsl(format!("{FULLSCREEN_VS}{fragment_src}").into()),
    });
    let layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
        label: Some(label),
        bind_group_layouts: &[bgl],
        push_constant_ranges: &[],
    });
    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(label),
        layout: Some(&layout),
        vertex: wgpu::VertexState {
            module: &shader,
            entry_point: Some("vs"),
            compilation_options: wgpu::PipelineCompilationOptions::default(),
            buffers: &[],
        },
        fragment: Some(wgpu::FragmentState {
            module: &shader,
            entry_point: Some("fs"),
            compilation_options: wgpu::PipelineCompilationOptions::default(),
            targets: &[Some(wgpu::ColorTargetState {
                format: TARGET_FORMAT,
                blend: None,
                write_mask: wgpu::ColorWrites::ALL,
            })],
        }),
        primitive: wgpu::PrimitiveState::default(),
        depth_stencil: None,
        multisample: wgpu::MultisampleState::default(),
        multiview: None,
        cache: None,
    })
}

fn draw_fullscreen(
    encoder: &mut wgpu::CommandEncoder,
    label: &str,
    target: &wgpu::TextureView,
    pipeline: &wgpu::RenderPipeline,
    bind_group: &wgpu::BindGroup,
) {
    let mut rp = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
        label: Some(label),
        color_attachments: &[Some(wgpu::RenderPassColorAttachment {
            view: target,
            resolve_target: None,
            depth_slice: None,
            ops: wgpu::Operations {
                load: wgpu::LoadOp::Clear(wgpu::Color::TRANSPARENT),
                store: wgpu::StoreOp::Store,
            },
        })],
        depth_stencil_attachment: None,
        timestamp_writes: None,
        occlusion_query_set: None,
    });
    rp.set_pipeline(pipeline);
    rp.set_bind_group(0, bind_group, &[]);
    rp.draw(0..3, 0..1);
}

fn blur_params(sigma: f32, reach: f32, step: [f32; 2]) -> [u8; 16] {
    let mut params = [0u8; 16];
    params[0..4].copy_from_slice(&sigma.to_le_bytes());
    params[4..8].copy_from_slice(&reach.to_le_bytes());
    params[8..12].copy_from_slice(&step[0].to_le_bytes());
    params[12..16].copy_from_slice(&step[1].to_le_bytes());
    params
}

fn align_to(value: u32, alignment: u32) -> u32 {
    let mask = alignment - 1;
    (value + mask) & !mask
}

#[cfg(test)]
#[path = "../../tests/unit/render/gpu.rs"]
mod tests;
