// main.rs — desktop shell: winit window, wgpu renderer and egui chrome around the panosphere engine

#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod i18n;
mod renderer;

use std::cell::RefCell;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::mpsc::{channel, Receiver, Sender};
use std::thread;
use std::time::Instant;

use image::io::Reader as ImageReader;
use image::RgbaImage;
use log::{debug, error, info, warn};
use panosphere::config::LangStrings;
use panosphere::events::{CTRL_ZOOM_OVERLAY, TWO_FINGERS_OVERLAY};
use panosphere::{
    AnimateOptions, EventKind, InputEvent, LoadTicket, Modifiers, MouseButton, PanoData,
    PanoDataHint, PanoramaOptions, Size, Touch, Transition, TransitionEffect, TransitionOptions,
    Viewer, ViewerConfig, ViewerEvent,
};
use renderer::{GpuRenderer, SceneBridge, TextureSlot};
use winit::{
    dpi::LogicalSize,
    event::*,
    event_loop::{ControlFlow, EventLoop},
    window::{Fullscreen, Window, WindowBuilder},
};

const IMAGE_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "bmp", "webp"];

struct Args {
    config: Option<PathBuf>,
    panorama: Option<PathBuf>,
}

/// `[--config <file.json>] [--lang <code>] [panorama]`
fn parse_args() -> Args {
    let mut args = Args {
        config: None,
        panorama: None,
    };
    let mut it = std::env::args().skip(1);
    while let Some(arg) = it.next() {
        match arg.as_str() {
            "--config" => args.config = it.next().map(PathBuf::from),
            "--lang" => {
                it.next();
            }
            _ => args.panorama = Some(PathBuf::from(arg)),
        }
    }
    args
}

enum LoadMessage {
    Loaded {
        ticket: LoadTicket,
        image: RgbaImage,
        data: PanoData,
    },
    Failed {
        ticket: LoadTicket,
        error: String,
    },
}

/// What the egui chrome shows, fed by viewer events.
#[derive(Default)]
struct UiState {
    overlay: Option<&'static str>,
    loading: bool,
    load_error: Option<String>,
    show_fps: bool,
    fps: f32,
    fullscreen: bool,
    transition: Option<TransitionEffect>,
}

/// Requests collected while drawing the UI, applied once the frame is done.
#[derive(Default)]
struct UiActions {
    open: Option<PathBuf>,
    reset_view: bool,
    toggle_fullscreen: bool,
    exit: bool,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = parse_args();
    i18n::init(i18n::resolve_lang_from_args());

    let config = match &args.config {
        Some(path) => ViewerConfig::from_file(path).unwrap_or_else(|err| {
            error!("cannot read config {}: {err}", path.display());
            ViewerConfig::default()
        }),
        None => ViewerConfig::default(),
    };

    let event_loop = EventLoop::new();
    let window = match WindowBuilder::new()
        .with_title(i18n::tr("app.title"))
        .with_inner_size(LogicalSize::new(1280, 720))
        .build(&event_loop)
    {
        Ok(window) => window,
        Err(err) => {
            error!("cannot create window: {err}");
            return;
        }
    };

    let gpu = match pollster::block_on(GpuRenderer::new(&window)) {
        Ok(gpu) => Rc::new(RefCell::new(gpu)),
        Err(err) => {
            error!("cannot initialise the GPU: {err}");
            return;
        }
    };

    let mut ui = UiState {
        transition: config.default_transition.as_ref().map(|t| t.effect),
        ..Default::default()
    };
    let mut viewer = match Viewer::new(config, SceneBridge::new(gpu.clone())) {
        Ok(viewer) => viewer,
        Err(err) => {
            error!("invalid configuration: {err}");
            return;
        }
    };
    let scale_factor = window.scale_factor();
    viewer.set_pixel_ratio(scale_factor);
    viewer.resize(logical_size(&window));

    // events the chrome reacts to, drained after each engine frame
    let ui_events: Rc<RefCell<Vec<ViewerEvent>>> = Rc::default();
    for kind in [
        EventKind::ShowOverlay,
        EventKind::HideOverlay,
        EventKind::TransitionDone,
        EventKind::Fullscreen,
    ] {
        let sink = ui_events.clone();
        viewer.on(kind, move |ctx| sink.borrow_mut().push(ctx.event.clone()));
    }

    let (tx, rx): (Sender<LoadMessage>, Receiver<LoadMessage>) = channel();
    let mut pending: Option<LoadTicket> = None;
    if let Some(path) = args.panorama {
        ui.loading = true;
        pending = Some(start_load(&mut viewer, path, tx.clone()));
    }

    let clock = Instant::now();
    let now = move || clock.elapsed().as_secs_f64() * 1000.0;
    let mut cursor = (0.0, 0.0);
    let mut modifiers = Modifiers::default();
    let mut touches: Vec<Touch> = Vec::new();
    let mut fps_window = (Instant::now(), 0u32);

    event_loop.run(move |event, _, control_flow| {
        *control_flow = ControlFlow::Poll;

        while let Ok(message) = rx.try_recv() {
            handle_load(&mut viewer, &gpu, &mut ui, &mut pending, message);
        }

        match event {
            Event::WindowEvent { event, .. } => {
                let consumed = {
                    let mut gpu = gpu.borrow_mut();
                    let gpu = &mut *gpu;
                    gpu.egui_state.on_event(&gpu.egui_ctx, &event).consumed
                };
                if consumed {
                    return;
                }
                let scale = window.scale_factor();

                match event {
                    WindowEvent::CloseRequested => *control_flow = ControlFlow::Exit,

                    WindowEvent::Resized(size) => {
                        gpu.borrow_mut().resize(size);
                        viewer.resize(logical_size(&window));
                    }

                    WindowEvent::ScaleFactorChanged {
                        scale_factor,
                        new_inner_size,
                    } => {
                        gpu.borrow_mut().resize(*new_inner_size);
                        viewer.set_pixel_ratio(scale_factor);
                        viewer.resize(logical_size(&window));
                    }

                    WindowEvent::ModifiersChanged(state) => {
                        modifiers = Modifiers {
                            ctrl: state.ctrl(),
                            alt: state.alt(),
                            shift: state.shift(),
                            meta: state.logo(),
                        };
                    }

                    WindowEvent::KeyboardInput { input, .. } => {
                        let Some(code) = input.virtual_keycode else {
                            return;
                        };
                        if input.state == ElementState::Pressed {
                            match code {
                                VirtualKeyCode::O if modifiers.ctrl => {
                                    if let Some(path) = pick_file() {
                                        ui.loading = true;
                                        pending = Some(start_load(&mut viewer, path, tx.clone()));
                                    }
                                    return;
                                }
                                VirtualKeyCode::F11 => {
                                    toggle_fullscreen(&window, &mut viewer, &mut ui, now());
                                    return;
                                }
                                _ => {}
                            }
                        }
                        if let Some(key) = key_name(code) {
                            let event = match input.state {
                                ElementState::Pressed => InputEvent::KeyDown { key, modifiers },
                                ElementState::Released => InputEvent::KeyUp { key },
                            };
                            viewer.handle_input(event, now());
                        }
                    }

                    WindowEvent::CursorMoved { position, .. } => {
                        let position = position.to_logical::<f64>(scale);
                        cursor = (position.x, position.y);
                        viewer.handle_input(
                            InputEvent::PointerMove {
                                x: cursor.0,
                                y: cursor.1,
                            },
                            now(),
                        );
                    }

                    WindowEvent::MouseInput { state, button, .. } => {
                        let button = match button {
                            winit::event::MouseButton::Left => MouseButton::Left,
                            winit::event::MouseButton::Right => MouseButton::Right,
                            winit::event::MouseButton::Middle => MouseButton::Middle,
                            winit::event::MouseButton::Other(id) => MouseButton::Other(id),
                        };
                        let (x, y) = cursor;
                        let event = match state {
                            ElementState::Pressed => InputEvent::PointerDown { x, y, button },
                            ElementState::Released => InputEvent::PointerUp { x, y, button },
                        };
                        viewer.handle_input(event, now());
                    }

                    WindowEvent::MouseWheel { delta, .. } => {
                        // positive means scrolling down, like DOM wheel events
                        let delta_y = match delta {
                            MouseScrollDelta::LineDelta(_, y) => -y as f64,
                            MouseScrollDelta::PixelDelta(pos) => -pos.y,
                        };
                        viewer.handle_input(InputEvent::Wheel { delta_y }, now());
                    }

                    WindowEvent::Touch(touch) => {
                        let location = touch.location.to_logical::<f64>(scale);
                        let changed = Touch {
                            id: touch.id,
                            x: location.x,
                            y: location.y,
                        };
                        let event = match touch.phase {
                            TouchPhase::Started => {
                                touches.push(changed);
                                InputEvent::TouchStart {
                                    touches: touches.clone(),
                                    changed: vec![changed],
                                }
                            }
                            TouchPhase::Moved => {
                                if let Some(known) = touches.iter_mut().find(|t| t.id == touch.id) {
                                    *known = changed;
                                }
                                InputEvent::TouchMove {
                                    touches: touches.clone(),
                                    changed: vec![changed],
                                }
                            }
                            TouchPhase::Ended | TouchPhase::Cancelled => {
                                touches.retain(|t| t.id != touch.id);
                                InputEvent::TouchEnd {
                                    touches: touches.clone(),
                                    changed: vec![changed],
                                }
                            }
                        };
                        viewer.handle_input(event, now());
                    }

                    WindowEvent::DroppedFile(path) => {
                        ui.loading = true;
                        pending = Some(start_load(&mut viewer, path, tx.clone()));
                    }

                    _ => {}
                }
            }

            Event::RedrawRequested(_) => {
                fps_window.1 += 1;
                let elapsed = fps_window.0.elapsed().as_secs_f32();
                if elapsed >= 1.0 {
                    ui.fps = fps_window.1 as f32 / elapsed;
                    fps_window = (Instant::now(), 0);
                }

                viewer.frame(now());

                for event in ui_events.borrow_mut().drain(..) {
                    match event {
                        ViewerEvent::ShowOverlay { id } => ui.overlay = Some(id),
                        ViewerEvent::HideOverlay { id } if ui.overlay == Some(id) => ui.overlay = None,
                        ViewerEvent::TransitionDone { completed: true } => gpu.borrow_mut().promote_incoming(),
                        ViewerEvent::TransitionDone { completed: false } => gpu.borrow_mut().discard_incoming(),
                        ViewerEvent::Fullscreen { enabled } => ui.fullscreen = enabled,
                        _ => {}
                    }
                }

                let mut actions = UiActions::default();
                let render_result = gpu
                    .borrow_mut()
                    .render_with_ui(&window, |ctx| draw_ui(ctx, &viewer, &mut ui, &mut actions));

                match render_result {
                    Ok(()) => {}
                    Err(wgpu::SurfaceError::Lost) => {
                        let mut gpu = gpu.borrow_mut();
                        let size = gpu.size;
                        gpu.resize(size);
                    }
                    Err(wgpu::SurfaceError::OutOfMemory) => *control_flow = ControlFlow::Exit,
                    Err(err) => warn!("render error: {err:?}"),
                }

                if let Some(path) = actions.open {
                    ui.loading = true;
                    pending = Some(start_load(&mut viewer, path, tx.clone()));
                }
                if actions.reset_view {
                    reset_view(&mut viewer);
                }
                if actions.toggle_fullscreen {
                    toggle_fullscreen(&window, &mut viewer, &mut ui, now());
                }
                if actions.exit {
                    *control_flow = ControlFlow::Exit;
                }
            }

            Event::MainEventsCleared => window.request_redraw(),

            _ => {}
        }
    });
}

fn logical_size(window: &Window) -> Size {
    let size = window.inner_size().to_logical::<f64>(window.scale_factor());
    Size {
        width: size.width,
        height: size.height,
    }
}

fn pick_file() -> Option<PathBuf> {
    rfd::FileDialog::new()
        .add_filter(i18n::tr("file.filter.images"), &IMAGE_EXTENSIONS)
        .pick_file()
}

/// Web-style key names understood by `keyboardActions`.
fn key_name(code: VirtualKeyCode) -> Option<String> {
    let name = match code {
        VirtualKeyCode::Up => "ArrowUp",
        VirtualKeyCode::Down => "ArrowDown",
        VirtualKeyCode::Left => "ArrowLeft",
        VirtualKeyCode::Right => "ArrowRight",
        VirtualKeyCode::PageUp => "PageUp",
        VirtualKeyCode::PageDown => "PageDown",
        VirtualKeyCode::Home => "Home",
        VirtualKeyCode::End => "End",
        VirtualKeyCode::Plus | VirtualKeyCode::NumpadAdd | VirtualKeyCode::Equals => "+",
        VirtualKeyCode::Minus | VirtualKeyCode::NumpadSubtract => "-",
        VirtualKeyCode::LControl | VirtualKeyCode::RControl => "Control",
        VirtualKeyCode::LShift | VirtualKeyCode::RShift => "Shift",
        VirtualKeyCode::LAlt | VirtualKeyCode::RAlt => "Alt",
        VirtualKeyCode::Escape => "Escape",
        VirtualKeyCode::Space => " ",
        VirtualKeyCode::Return => "Enter",
        other => {
            let debug = format!("{other:?}");
            return (debug.len() == 1).then(|| debug.to_lowercase());
        }
    };
    Some(name.to_string())
}

fn toggle_fullscreen(window: &Window, viewer: &mut Viewer, ui: &mut UiState, now: f64) {
    let enabled = !ui.fullscreen;
    window.set_fullscreen(enabled.then_some(Fullscreen::Borderless(None)));
    viewer.handle_input(InputEvent::FullscreenChanged(enabled), now);
}

fn reset_view(viewer: &mut Viewer) {
    let options = AnimateOptions::new("2rpm")
        .position(viewer.config().default_position())
        .zoom(viewer.config().default_zoom_lvl);
    if let Err(err) = viewer.animate(options) {
        warn!("cannot reset the view: {err}");
    }
}

/// `<image>.json` next to the panorama may describe how it is cropped.
fn read_pano_hint(path: &Path) -> Option<PanoDataHint> {
    let text = std::fs::read_to_string(path.with_extension("json")).ok()?;
    match serde_json::from_str(&text) {
        Ok(hint) => Some(hint),
        Err(err) => {
            warn!("ignoring pano data of {}: {err}", path.display());
            None
        }
    }
}

fn start_load(viewer: &mut Viewer, path: PathBuf, tx: Sender<LoadMessage>) -> LoadTicket {
    let ticket = viewer.begin_load(path.display().to_string());
    let worker_ticket = ticket.clone();

    thread::spawn(move || {
        let ticket = worker_ticket;
        info!(
            "{}",
            i18n::tr_with("log.loading_image_bg", &[("path", path.display().to_string())])
        );

        let decoded = File::open(&path)
            .map_err(|err| i18n::tr_with("error.open_file", &[("err", err.to_string())]))
            .and_then(|file| {
                ImageReader::new(BufReader::new(file))
                    .with_guessed_format()
                    .map_err(image::ImageError::IoError)
                    .and_then(|mut reader| {
                        reader.no_limits();
                        reader.decode()
                    })
                    .map_err(|err| i18n::tr_with("error.decode_image", &[("err", err.to_string())]))
            });

        let message = match decoded {
            Ok(image) => {
                let image = image.to_rgba8();
                let (width, height) = image.dimensions();
                info!(
                    "{}",
                    i18n::tr_with(
                        "log.image_loaded_size",
                        &[("w", width.to_string()), ("h", height.to_string())]
                    )
                );
                let data = PanoData::merge(width, height, read_pano_hint(&path).as_ref());
                LoadMessage::Loaded {
                    ticket,
                    image,
                    data,
                }
            }
            Err(error) => LoadMessage::Failed { ticket, error },
        };
        if tx.send(message).is_err() {
            debug!("viewer closed before {} finished loading", path.display());
        }
    });

    ticket
}

fn handle_load(
    viewer: &mut Viewer,
    gpu: &Rc<RefCell<GpuRenderer>>,
    ui: &mut UiState,
    pending: &mut Option<LoadTicket>,
    message: LoadMessage,
) {
    let (ticket, result) = match message {
        LoadMessage::Loaded {
            ticket,
            image,
            data,
        } => {
            let transition = match ui.transition {
                Some(effect) => Transition::Custom(TransitionOptions {
                    effect,
                    ..viewer.config().default_transition.clone().unwrap_or_default()
                }),
                None => Transition::Disabled,
            };
            let options = PanoramaOptions {
                transition,
                ..Default::default()
            };
            let result = viewer.finish_load(&ticket, data, options).map(|animation| {
                let slot = match animation {
                    Some(_) => TextureSlot::Incoming,
                    None => TextureSlot::Current,
                };
                gpu.borrow_mut().upload(&image, &data, slot);
            });
            (ticket, result.map_err(|err| (err.is_abort(), err.to_string())))
        }
        LoadMessage::Failed { ticket, error } => (ticket, Err((false, error))),
    };

    if pending.as_ref() != Some(&ticket) {
        return;
    }
    *pending = None;
    ui.loading = false;
    match result {
        Ok(()) => ui.load_error = None,
        Err((true, _)) => {}
        Err((false, err)) => {
            error!("{}: {err}", ticket.path);
            ui.load_error = Some(err);
        }
    }
}

/// Overlay text: custom strings from the config win over the i18n table.
fn overlay_text(config: &ViewerConfig, id: &str) -> String {
    let defaults = LangStrings::default();
    let (custom, default, key) = match id {
        TWO_FINGERS_OVERLAY => (&config.lang.two_fingers, defaults.two_fingers, "overlay.two_fingers"),
        CTRL_ZOOM_OVERLAY => (&config.lang.ctrl_zoom, defaults.ctrl_zoom, "overlay.ctrl_zoom"),
        _ => return id.to_string(),
    };
    if *custom != default {
        custom.clone()
    } else {
        i18n::tr(key)
    }
}

fn draw_ui(ctx: &egui::Context, viewer: &Viewer, ui_state: &mut UiState, actions: &mut UiActions) {
    egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
        egui::menu::bar(ui, |ui| {
            ui.menu_button(i18n::tr("menu.file"), |ui| {
                if ui.button(i18n::tr("menu.open_image")).clicked() {
                    ui.close_menu();
                    actions.open = pick_file();
                }
                if ui.button(i18n::tr("menu.exit")).clicked() {
                    actions.exit = true;
                }
            });

            ui.menu_button(i18n::tr("menu.view"), |ui| {
                if ui.button(i18n::tr("view.reset")).clicked() {
                    actions.reset_view = true;
                    ui.close_menu();
                }
                let fullscreen_label = if ui_state.fullscreen {
                    i18n::tr("view.fullscreen.exit")
                } else {
                    i18n::tr("view.fullscreen.enter")
                };
                if ui.button(fullscreen_label).clicked() {
                    actions.toggle_fullscreen = true;
                    ui.close_menu();
                }

                ui.separator();
                ui.menu_button(i18n::tr("view.transition"), |ui| {
                    let choices = [
                        (Some(TransitionEffect::Fade), "transition.fade"),
                        (Some(TransitionEffect::Black), "transition.black"),
                        (Some(TransitionEffect::White), "transition.white"),
                        (None, "transition.none"),
                    ];
                    for (effect, key) in choices {
                        if ui
                            .radio_value(&mut ui_state.transition, effect, i18n::tr(key))
                            .clicked()
                        {
                            ui.close_menu();
                        }
                    }
                });

                ui.separator();
                if ui
                    .checkbox(&mut ui_state.show_fps, i18n::tr("view.show_fps"))
                    .clicked()
                {
                    ui.close_menu();
                }
            });
        });
    });

    egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
        ui.horizontal(|ui| {
            if ui_state.loading {
                ui.label(
                    egui::RichText::new(i18n::tr("status.loading_image")).color(egui::Color32::YELLOW),
                );
                ui.label("|");
            }
            if let Some(err) = &ui_state.load_error {
                ui.label(
                    egui::RichText::new(i18n::tr_with("status.load_error", &[("err", err.clone())]))
                        .color(egui::Color32::RED),
                );
                ui.label("|");
            }

            let position = viewer.get_position();
            let state = viewer.state();
            ui.label(format!("Yaw: {:.1}°", position.yaw.to_degrees()));
            ui.label("|");
            ui.label(format!("Pitch: {:.1}°", position.pitch.to_degrees()));
            ui.label("|");
            ui.label(format!("{}: {:.0}", i18n::tr("status.zoom"), viewer.get_zoom_level()));
            ui.label("|");
            ui.label(format!("FOV: {:.1}°", state.v_fov));

            if ui_state.show_fps {
                ui.label("|");
                ui.label(
                    egui::RichText::new(format!("FPS: {:.1}", ui_state.fps)).color(egui::Color32::GREEN),
                );
            }
        });
    });

    if let Some(id) = ui_state.overlay {
        egui::Area::new("overlay")
            .anchor(egui::Align2::CENTER_CENTER, egui::Vec2::ZERO)
            .interactable(false)
            .show(ctx, |ui| {
                egui::Frame::popup(ui.style()).show(ui, |ui| {
                    ui.heading(overlay_text(viewer.config(), id));
                });
            });
    }
}
