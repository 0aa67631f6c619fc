// renderer.rs — wgpu ray-casting renderer of the desktop shell (fullscreen triangle + egui)

use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use image::{imageops::FilterType, GenericImage, Rgba, RgbaImage};
use log::{info, warn};
use panosphere::scene::camera_basis;
use panosphere::{Intersection, PanoData, SceneRenderer, SphereRaycaster, ViewerState};
use wgpu::util::DeviceExt;
use winit::window::Window;

fn font_candidates() -> Vec<PathBuf> {
    let system: &[&str] = if cfg!(windows) {
        &[
            r"C:\Windows\Fonts\segoeui.ttf",
            r"C:\Windows\Fonts\msyh.ttf",
            r"C:\Windows\Fonts\arial.ttf",
        ]
    } else if cfg!(target_os = "macos") {
        &[
            "/System/Library/Fonts/Supplemental/Arial Unicode.ttf",
            "/Library/Fonts/Arial Unicode.ttf",
            "/System/Library/Fonts/Supplemental/Arial.ttf",
        ]
    } else {
        &[
            "/usr/share/fonts/truetype/noto/NotoSans-Regular.ttf",
            "/usr/share/fonts/opentype/noto/NotoSansCJK-Regular.ttc",
            "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
        ]
    };

    let mut candidates: Vec<PathBuf> = system.iter().map(PathBuf::from).collect();
    let asset_dirs = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(|dir| dir.join("assets")))
        .into_iter()
        .chain(std::iter::once(PathBuf::from("assets")));
    for dir in asset_dirs {
        candidates.push(dir.join("NotoSans-Regular.ttf"));
        candidates.push(dir.join("NotoSansCJK-Regular.ttc"));
    }
    candidates
}

/// Reads a font file, keeping it only if ab_glyph can parse it.
fn load_font(path: &Path) -> Option<Vec<u8>> {
    let bytes = std::fs::read(path).ok()?;
    ab_glyph::FontArc::try_from_vec(bytes.clone()).ok()?;
    Some(bytes)
}

fn setup_egui_fonts(ctx: &egui::Context) {
    let Some((path, bytes)) = font_candidates()
        .into_iter()
        .find_map(|path| load_font(&path).map(|bytes| (path, bytes)))
    else {
        info!("{}", crate::i18n::tr("font.not_found"));
        return;
    };
    info!(
        "{}",
        crate::i18n::tr_with("font.using", &[("path", path.display().to_string())])
    );

    let mut fonts = egui::FontDefinitions::default();
    fonts
        .font_data
        .insert("ui".to_owned(), egui::FontData::from_owned(bytes));
    for family in [egui::FontFamily::Proportional, egui::FontFamily::Monospace] {
        if let Some(family) = fonts.families.get_mut(&family) {
            family.insert(0, "ui".to_owned());
        }
    }
    ctx.set_fonts(fonts);
}

/// Camera frame and blending parameters, laid out as five `vec4<f32>`.
#[repr(C)]
#[derive(Debug, Copy, Clone, Default, bytemuck::Pod, bytemuck::Zeroable)]
struct CameraUniform {
    forward: [f32; 4],
    right: [f32; 4],
    up: [f32; 4],
    /// tan(vFov / 2), aspect, fisheye, unused
    lens: [f32; 4],
    /// incoming opacity, exposure, unused, unused
    blend: [f32; 4],
}

impl CameraUniform {
    fn from_state(state: &ViewerState) -> Self {
        let (forward, right, up) = camera_basis(state);
        let (opacity, exposure) = state
            .transition
            .as_ref()
            .map_or((0.0, 1.0), |transition| {
                (transition.incoming_opacity(), transition.exposure())
            });
        let vec4 = |v: glam::DVec3| [v.x as f32, v.y as f32, v.z as f32, 0.0];

        Self {
            forward: vec4(forward),
            right: vec4(right),
            up: vec4(up),
            lens: [
                (state.v_fov.to_radians() / 2.0).tan() as f32,
                state.aspect as f32,
                state.fisheye as f32,
                0.0,
            ],
            blend: [opacity as f32, exposure as f32, 0.0, 0.0],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureSlot {
    /// The panorama on screen.
    Current,
    /// The panorama fading in during a transition.
    Incoming,
}

struct PanoTexture {
    _texture: wgpu::Texture,
    view: wgpu::TextureView,
}

pub struct GpuRenderer {
    surface: wgpu::Surface,
    device: wgpu::Device,
    queue: wgpu::Queue,
    config: wgpu::SurfaceConfiguration,
    pub size: winit::dpi::PhysicalSize<u32>,
    render_pipeline: wgpu::RenderPipeline,

    bind_group_layout: wgpu::BindGroupLayout,
    bind_group: wgpu::BindGroup,
    current: PanoTexture,
    incoming: PanoTexture,
    sampler: wgpu::Sampler,

    camera_uniform: CameraUniform,
    camera_buffer: wgpu::Buffer,

    pub egui_ctx: egui::Context,
    pub egui_state: egui_winit::State,
    egui_renderer: egui_wgpu::Renderer,
}

impl GpuRenderer {
    pub async fn new(window: &Window) -> Result<Self, String> {
        let size = window.inner_size();
        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::all(),
            ..Default::default()
        });

        let surface = unsafe { instance.create_surface(window) }.map_err(|err| err.to_string())?;
        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .ok_or("no suitable GPU adapter")?;

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    features: wgpu::Features::empty(),
                    limits: wgpu::Limits::default().using_resolution(adapter.limits()),
                    label: None,
                },
                None,
            )
            .await
            .map_err(|err| err.to_string())?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = surface_caps
            .formats
            .iter()
            .copied()
            .find(|format| format.is_srgb())
            .or_else(|| surface_caps.formats.first().copied())
            .ok_or("surface has no format")?;

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode: wgpu::PresentMode::Fifo,
            alpha_mode: surface_caps
                .alpha_modes
                .first()
                .copied()
                .unwrap_or(wgpu::CompositeAlphaMode::Auto),
            view_formats: vec![],
        };
        surface.configure(&device, &config);

        let current = placeholder_texture(&device, &queue, [40, 40, 40, 255]);
        let incoming = placeholder_texture(&device, &queue, [0, 0, 0, 255]);
        let sampler = device.create_sampler(&wgpu::SamplerDescriptor {
            address_mode_u: wgpu::AddressMode::Repeat,
            address_mode_v: wgpu::AddressMode::ClampToEdge,
            address_mode_w: wgpu::AddressMode::ClampToEdge,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        });

        let camera_uniform = CameraUniform::from_state(&ViewerState::default());
        let camera_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("camera_buffer"),
            contents: bytemuck::cast_slice(&[camera_uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let texture_entry = |binding| wgpu::BindGroupLayoutEntry {
            binding,
            visibility: wgpu::ShaderStages::FRAGMENT,
            ty: wgpu::BindingType::Texture {
                multisampled: false,
                view_dimension: wgpu::TextureViewDimension::D2,
                sample_type: wgpu::TextureSampleType::Float { filterable: true },
            },
            count: None,
        };
        let bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[
                wgpu::BindGroupLayoutEntry {
                    binding: 0,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Buffer {
                        ty: wgpu::BufferBindingType::Uniform,
                        has_dynamic_offset: false,
                        min_binding_size: None,
                    },
                    count: None,
                },
                texture_entry(1),
                wgpu::BindGroupLayoutEntry {
                    binding: 2,
                    visibility: wgpu::ShaderStages::FRAGMENT,
                    ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                    count: None,
                },
                texture_entry(3),
            ],
            label: Some("panorama_bind_group_layout"),
        });
        let bind_group = create_bind_group(
            &device,
            &bind_group_layout,
            &camera_buffer,
            &current,
            &incoming,
            &sampler,
        );

        let shader = device.create_shader_module(wgpu::include_wgsl!("shader_equirect.wgsl"));
        let render_pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("panorama_pipeline_layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });
        let render_pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("panorama_pipeline"),
            layout: Some(&render_pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: "vs_main",
                buffers: &[],
            },
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: "fs_main",
                targets: &[Some(wgpu::ColorTargetState {
                    format: config.format,
                    blend: Some(wgpu::BlendState::REPLACE),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
            }),
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleList,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState {
                count: 1,
                mask: !0,
                alpha_to_coverage_enabled: false,
            },
            multiview: None,
        });

        let egui_ctx = egui::Context::default();
        setup_egui_fonts(&egui_ctx);
        let mut egui_state = egui_winit::State::new(window);
        egui_state.set_pixels_per_point(window.scale_factor() as f32);
        let egui_renderer = egui_wgpu::Renderer::new(&device, config.format, None, 1);

        Ok(Self {
            surface,
            device,
            queue,
            config,
            size,
            render_pipeline,
            bind_group_layout,
            bind_group,
            current,
            incoming,
            sampler,
            camera_uniform,
            camera_buffer,
            egui_ctx,
            egui_state,
            egui_renderer,
        })
    }

    pub fn resize(&mut self, new_size: winit::dpi::PhysicalSize<u32>) {
        if new_size.width > 0 && new_size.height > 0 {
            self.size = new_size;
            self.config.width = new_size.width;
            self.config.height = new_size.height;
            self.surface.configure(&self.device, &self.config);
        }
    }

    pub fn update_camera(&mut self, state: &ViewerState) {
        self.camera_uniform = CameraUniform::from_state(state);
        self.queue
            .write_buffer(&self.camera_buffer, 0, bytemuck::cast_slice(&[self.camera_uniform]));
    }

    /// Uploads a decoded panorama into `slot`, placing a cropped image inside its full
    /// equirectangular frame.
    pub fn upload(&mut self, image: &RgbaImage, data: &PanoData, slot: TextureSlot) {
        let max = self.device.limits().max_texture_dimension_2d;
        let frame = compose_equirectangular(image, data, max);
        let (width, height) = frame.dimensions();
        let size = wgpu::Extent3d {
            width,
            height,
            depth_or_array_layers: 1,
        };
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            label: Some("panorama_texture"),
            view_formats: &[],
        });
        self.queue.write_texture(
            wgpu::ImageCopyTexture {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            &frame,
            wgpu::ImageDataLayout {
                offset: 0,
                bytes_per_row: Some(4 * width),
                rows_per_image: Some(height),
            },
            size,
        );
        let pano = PanoTexture {
            view: texture.create_view(&wgpu::TextureViewDescriptor::default()),
            _texture: texture,
        };

        match slot {
            TextureSlot::Current => self.current = pano,
            TextureSlot::Incoming => self.incoming = pano,
        }
        self.rebuild_bind_group();
    }

    /// Makes the incoming panorama the current one once its transition completed.
    pub fn promote_incoming(&mut self) {
        let blank = placeholder_texture(&self.device, &self.queue, [0, 0, 0, 255]);
        self.current = std::mem::replace(&mut self.incoming, blank);
        self.rebuild_bind_group();
    }

    /// Drops the incoming panorama of a cancelled transition.
    pub fn discard_incoming(&mut self) {
        self.incoming = placeholder_texture(&self.device, &self.queue, [0, 0, 0, 255]);
        self.rebuild_bind_group();
    }

    fn rebuild_bind_group(&mut self) {
        self.bind_group = create_bind_group(
            &self.device,
            &self.bind_group_layout,
            &self.camera_buffer,
            &self.current,
            &self.incoming,
            &self.sampler,
        );
    }

    pub fn render_with_ui(
        &mut self,
        window: &Window,
        run_ui: impl FnOnce(&egui::Context),
    ) -> Result<(), wgpu::SurfaceError> {
        let output = self.surface.get_current_texture()?;
        let view = output
            .texture
            .create_view(&wgpu::TextureViewDescriptor::default());
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("frame_encoder"),
            });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("panorama_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Clear(wgpu::Color::BLACK),
                        store: true,
                    },
                })],
                depth_stencil_attachment: None,
            });
            render_pass.set_pipeline(&self.render_pipeline);
            render_pass.set_bind_group(0, &self.bind_group, &[]);
            render_pass.draw(0..3, 0..1);
        }

        let raw_input = self.egui_state.take_egui_input(window);
        let full_output = self.egui_ctx.run(raw_input, run_ui);
        self.egui_state
            .handle_platform_output(window, &self.egui_ctx, full_output.platform_output);
        let clipped_primitives = self.egui_ctx.tessellate(full_output.shapes);
        let screen_descriptor = egui_wgpu::renderer::ScreenDescriptor {
            size_in_pixels: [self.config.width, self.config.height],
            pixels_per_point: window.scale_factor() as f32,
        };

        for (id, delta) in &full_output.textures_delta.set {
            self.egui_renderer
                .update_texture(&self.device, &self.queue, *id, delta);
        }
        self.egui_renderer.update_buffers(
            &self.device,
            &self.queue,
            &mut encoder,
            &clipped_primitives,
            &screen_descriptor,
        );
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("egui_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: true,
                    },
                })],
                depth_stencil_attachment: None,
            });
            self.egui_renderer
                .render(&mut render_pass, &clipped_primitives, &screen_descriptor);
        }
        for id in &full_output.textures_delta.free {
            self.egui_renderer.free_texture(id);
        }

        self.queue.submit(std::iter::once(encoder.finish()));
        output.present();
        Ok(())
    }
}

fn placeholder_texture(device: &wgpu::Device, queue: &wgpu::Queue, color: [u8; 4]) -> PanoTexture {
    let size = wgpu::Extent3d {
        width: 1,
        height: 1,
        depth_or_array_layers: 1,
    };
    let texture = device.create_texture_with_data(
        queue,
        &wgpu::TextureDescriptor {
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: wgpu::TextureFormat::Rgba8UnormSrgb,
            usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
            label: Some("placeholder_texture"),
            view_formats: &[],
        },
        &color,
    );
    PanoTexture {
        view: texture.create_view(&wgpu::TextureViewDescriptor::default()),
        _texture: texture,
    }
}

fn create_bind_group(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    camera_buffer: &wgpu::Buffer,
    current: &PanoTexture,
    incoming: &PanoTexture,
    sampler: &wgpu::Sampler,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::TextureView(&current.view),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::Sampler(sampler),
            },
            wgpu::BindGroupEntry {
                binding: 3,
                resource: wgpu::BindingResource::TextureView(&incoming.view),
            },
        ],
        label: Some("panorama_bind_group"),
    })
}

/// Fits the panorama's full frame within `max` pixels and pastes the (possibly cropped)
/// image at its offset, leaving the rest black.
pub fn compose_equirectangular(image: &RgbaImage, data: &PanoData, max: u32) -> RgbaImage {
    let scale = (max as f64 / data.full_width.max(data.full_height).max(1) as f64).min(1.0);
    let scaled = |value: u32| ((value as f64 * scale).round() as u32).max(1);

    if data.is_full() && scale >= 1.0 {
        return image.clone();
    }
    if scale < 1.0 {
        warn!(
            "{}",
            crate::i18n::tr_with(
                "gpu.image_too_large_scaled",
                &[
                    ("src_w", data.full_width.to_string()),
                    ("src_h", data.full_height.to_string()),
                    ("max", max.to_string()),
                    ("new_w", scaled(data.full_width).to_string()),
                    ("new_h", scaled(data.full_height).to_string()),
                ],
            )
        );
    }

    let mut frame = RgbaImage::from_pixel(
        scaled(data.full_width),
        scaled(data.full_height),
        Rgba([0, 0, 0, 255]),
    );
    let crop = if scale < 1.0 {
        image::imageops::resize(
            image,
            scaled(data.cropped_width),
            scaled(data.cropped_height),
            FilterType::Lanczos3,
        )
    } else {
        image.clone()
    };
    let x = ((data.cropped_x as f64 * scale).round() as u32)
        .min(frame.width().saturating_sub(crop.width()));
    let y = ((data.cropped_y as f64 * scale).round() as u32)
        .min(frame.height().saturating_sub(crop.height()));
    if let Err(err) = frame.copy_from(&crop, x, y) {
        warn!("cannot place cropped panorama: {err}");
    }
    frame
}

/// Engine-facing side of the GPU renderer: draws through the shared [`GpuRenderer`]
/// and hit-tests against the panorama sphere.
pub struct SceneBridge {
    gpu: Rc<RefCell<GpuRenderer>>,
    picker: SphereRaycaster,
}

impl SceneBridge {
    pub fn new(gpu: Rc<RefCell<GpuRenderer>>) -> Self {
        Self {
            gpu,
            picker: SphereRaycaster::default(),
        }
    }
}

impl SceneRenderer for SceneBridge {
    fn intersections(&self, state: &ViewerState, x: f64, y: f64) -> Vec<Intersection> {
        self.picker.intersections(state, x, y)
    }

    fn render(&mut self, state: &ViewerState) {
        match self.gpu.try_borrow_mut() {
            Ok(mut gpu) => gpu.update_camera(state),
            Err(_) => warn!("renderer busy, camera update skipped"),
        }
    }
}
