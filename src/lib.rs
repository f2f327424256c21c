//! Browser glue and frame scheduling for the endless cityscape.
//!
//! The simulation and painting live in pure modules; this file owns the
//! canvas, the WebGL full-screen-quad pipeline the framebuffer is drawn
//! through, and the requestAnimationFrame loop that drives one tick per
//! display refresh.

use std::cell::RefCell;
use std::rc::Rc;

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{
    Document, Event, HtmlCanvasElement, HtmlElement, WebGlBuffer, WebGlProgram,
    WebGlRenderingContext as Gl, WebGlShader, WebGlTexture, WebGlUniformLocation, Window,
};

pub mod corridor;
pub mod glyph_rain;
pub mod painter;
pub mod pixmap;
pub mod rng;
pub mod signals;

use corridor::{Corridor, CorridorConfig};
use pixmap::Pixmap;

const VERTEX_SHADER_SOURCE: &str = r#"
attribute vec2 a_position;
attribute vec2 a_texCoord;
varying vec2 v_texCoord;
void main() {
  gl_Position = vec4(a_position, 0.0, 1.0);
  v_texCoord = a_texCoord;
}
"#;

const FRAGMENT_SHADER_SOURCE: &str = r#"
precision mediump float;
varying vec2 v_texCoord;
uniform sampler2D u_texture;
void main() {
  gl_FragColor = texture2D(u_texture, v_texCoord);
}
"#;

/// Long-side cap for the CPU framebuffer. The quad is sampled with linear
/// filtering, so the GPU absorbs the stretch to high-DPI viewports.
const RENDER_CAP: f64 = 960.0;
/// Delta-time clamp; absorbs tab suspensions without a simulation jump.
const MAX_DT: f64 = 0.1;
const STATUS_ATTR: &str = "data-cityscape-status";

fn window() -> Window {
    web_sys::window().expect("missing window")
}

fn js_value_to_string(value: &JsValue) -> String {
    value.as_string().unwrap_or_else(|| format!("{:?}", value))
}

fn gl_error_name(error: u32) -> &'static str {
    match error {
        Gl::NO_ERROR => "NO_ERROR",
        Gl::INVALID_ENUM => "INVALID_ENUM",
        Gl::INVALID_VALUE => "INVALID_VALUE",
        Gl::INVALID_OPERATION => "INVALID_OPERATION",
        Gl::OUT_OF_MEMORY => "OUT_OF_MEMORY",
        Gl::INVALID_FRAMEBUFFER_OPERATION => "INVALID_FRAMEBUFFER_OPERATION",
        Gl::CONTEXT_LOST_WEBGL => "CONTEXT_LOST_WEBGL",
        _ => "UNKNOWN_ERROR",
    }
}

fn gl_check(gl: &Gl, label: &str) -> Option<String> {
    let error = gl.get_error();
    if error == Gl::NO_ERROR {
        None
    } else {
        Some(format!(
            "gl error after {}: {} (0x{:x})",
            label,
            gl_error_name(error),
            error
        ))
    }
}

fn set_status(document: &Document, status: &str) {
    if let Some(el) = document.document_element() {
        let _ = el.set_attribute(STATUS_ATTR, status);
    }
}

fn create_webgl_context(canvas: &HtmlCanvasElement) -> Result<Gl, JsValue> {
    // Conservative defaults to reduce GPU work; the quad needs no depth,
    // stencil, or multisampling.
    let options = js_sys::Object::new();
    js_sys::Reflect::set(&options, &JsValue::from_str("alpha"), &JsValue::FALSE)?;
    js_sys::Reflect::set(&options, &JsValue::from_str("antialias"), &JsValue::FALSE)?;
    js_sys::Reflect::set(&options, &JsValue::from_str("depth"), &JsValue::FALSE)?;
    js_sys::Reflect::set(&options, &JsValue::from_str("stencil"), &JsValue::FALSE)?;
    js_sys::Reflect::set(
        &options,
        &JsValue::from_str("powerPreference"),
        &JsValue::from_str("low-power"),
    )?;

    let options = JsValue::from(options);
    let ctx = canvas
        .get_context_with_context_options("webgl", &options)?
        .or_else(|| canvas.get_context("webgl").ok().flatten())
        .ok_or_else(|| JsValue::from_str("WebGL unavailable"))?;

    ctx.dyn_into::<Gl>()
        .map_err(|_| JsValue::from_str("WebGL context is not a WebGlRenderingContext"))
}

fn compile_shader(gl: &Gl, shader_type: u32, source: &str) -> Result<WebGlShader, JsValue> {
    let shader = gl
        .create_shader(shader_type)
        .ok_or_else(|| JsValue::from_str("Unable to create shader"))?;
    gl.shader_source(&shader, source);
    gl.compile_shader(&shader);

    if gl
        .get_shader_parameter(&shader, Gl::COMPILE_STATUS)
        .as_bool()
        .unwrap_or(false)
    {
        Ok(shader)
    } else {
        let info = gl
            .get_shader_info_log(&shader)
            .unwrap_or_else(|| "Unknown shader error".to_string());
        Err(JsValue::from_str(&info))
    }
}

fn create_program(
    gl: &Gl,
    vertex_source: &str,
    fragment_source: &str,
) -> Result<WebGlProgram, JsValue> {
    let vertex_shader = compile_shader(gl, Gl::VERTEX_SHADER, vertex_source)?;
    let fragment_shader = compile_shader(gl, Gl::FRAGMENT_SHADER, fragment_source)?;

    let program = gl
        .create_program()
        .ok_or_else(|| JsValue::from_str("Unable to create program"))?;

    gl.attach_shader(&program, &vertex_shader);
    gl.attach_shader(&program, &fragment_shader);
    gl.link_program(&program);

    if gl
        .get_program_parameter(&program, Gl::LINK_STATUS)
        .as_bool()
        .unwrap_or(false)
    {
        Ok(program)
    } else {
        let info = gl
            .get_program_info_log(&program)
            .unwrap_or_else(|| "Unknown program error".to_string());
        Err(JsValue::from_str(&info))
    }
}

fn upload_frame_texture(gl: &Gl, texture: &WebGlTexture, frame: &Pixmap) -> Result<(), JsValue> {
    gl.bind_texture(Gl::TEXTURE_2D, Some(texture));
    gl.pixel_storei(Gl::UNPACK_ALIGNMENT, 1);
    gl.pixel_storei(Gl::UNPACK_FLIP_Y_WEBGL, 0);

    gl.tex_image_2d_with_i32_and_i32_and_i32_and_format_and_type_and_opt_u8_array(
        Gl::TEXTURE_2D,
        0,
        Gl::RGBA as i32,
        frame.width() as i32,
        frame.height() as i32,
        0,
        Gl::RGBA,
        Gl::UNSIGNED_BYTE,
        Some(frame.pixels()),
    )?;

    Ok(())
}

/// The frame loop's state machine, explicit rather than closure-captured:
/// `running` is the Running/Stopped flag, `last_timestamp` anchors the
/// delta-time computation, `frames` counts render submissions.
struct FrameScheduler {
    running: bool,
    last_timestamp: Option<f64>,
    frames: u32,
}

struct AppState {
    gl: Gl,
    program: WebGlProgram,
    position_buffer: WebGlBuffer,
    tex_coord_buffer: WebGlBuffer,
    texture: WebGlTexture,
    a_position: u32,
    a_tex_coord: u32,
    u_texture: WebGlUniformLocation,
    canvas: HtmlCanvasElement,
    document: Document,
    frame: Pixmap,
    scene: Corridor,
    scheduler: FrameScheduler,
    context_lost: bool,
    max_surface: i32,
    last_gl_error: Option<String>,
}

type RafSlot = Rc<RefCell<Option<(i32, Closure<dyn FnMut(f64)>)>>>;

fn update_surface(state: &mut AppState, width: u32, height: u32) {
    let cap = state.max_surface.clamp(1, 4096) as u32;
    let width = width.clamp(1, cap);
    let height = height.clamp(1, cap);

    if state.canvas.width() != width {
        state.canvas.set_width(width);
    }
    if state.canvas.height() != height {
        state.canvas.set_height(height);
    }
    state.gl.viewport(0, 0, width as i32, height as i32);

    let scale = (RENDER_CAP / width.max(height) as f64).min(1.0);
    state.frame.resize(
        (width as f64 * scale).round() as usize,
        (height as f64 * scale).round() as usize,
    );
}

fn render(state: &AppState) {
    // Some implementations reset state on canvas resize; re-bind each draw.
    state.gl.use_program(Some(&state.program));

    state
        .gl
        .bind_buffer(Gl::ARRAY_BUFFER, Some(&state.position_buffer));
    state.gl.enable_vertex_attrib_array(state.a_position);
    state
        .gl
        .vertex_attrib_pointer_with_i32(state.a_position, 2, Gl::FLOAT, false, 0, 0);

    state
        .gl
        .bind_buffer(Gl::ARRAY_BUFFER, Some(&state.tex_coord_buffer));
    state.gl.enable_vertex_attrib_array(state.a_tex_coord);
    state
        .gl
        .vertex_attrib_pointer_with_i32(state.a_tex_coord, 2, Gl::FLOAT, false, 0, 0);

    state.gl.active_texture(Gl::TEXTURE0);
    state.gl.bind_texture(Gl::TEXTURE_2D, Some(&state.texture));
    state.gl.uniform1i(Some(&state.u_texture), 0);

    state.gl.clear_color(0.04, 0.04, 0.07, 1.0);
    state.gl.clear(Gl::COLOR_BUFFER_BIT);
    state.gl.draw_arrays(Gl::TRIANGLE_STRIP, 0, 4);
}

fn run_tick(state: &Rc<RefCell<AppState>>, timestamp: f64) -> bool {
    let mut st = state.borrow_mut();
    if !st.scheduler.running || st.context_lost {
        return false;
    }

    let dt = match st.scheduler.last_timestamp {
        Some(prev) => ((timestamp - prev) / 1000.0).clamp(0.0, MAX_DT),
        None => 0.0,
    };
    st.scheduler.last_timestamp = Some(timestamp);

    let st = &mut *st;
    st.scene.advance(dt);
    painter::paint_scene(&mut st.frame, &st.scene);

    let gl_err = match upload_frame_texture(&st.gl, &st.texture, &st.frame) {
        Ok(()) => {
            render(st);
            gl_check(&st.gl, "render")
        }
        Err(err) => Some(js_value_to_string(&err)),
    };
    if gl_err != st.last_gl_error {
        if let Some(msg) = &gl_err {
            web_sys::console::warn_1(&JsValue::from_str(msg));
        }
        st.last_gl_error = gl_err;
    }

    st.scheduler.frames = st.scheduler.frames.wrapping_add(1);
    true
}

fn schedule_tick(state: &Rc<RefCell<AppState>>, raf: &RafSlot) {
    if raf.borrow().is_some() {
        return;
    }

    let state_cb = Rc::clone(state);
    let raf_cb = Rc::clone(raf);
    let cb = Closure::wrap(Box::new(move |timestamp: f64| {
        raf_cb.borrow_mut().take();
        if run_tick(&state_cb, timestamp) {
            schedule_tick(&state_cb, &raf_cb);
        }
    }) as Box<dyn FnMut(f64)>);

    match window().request_animation_frame(cb.as_ref().unchecked_ref()) {
        Ok(id) => *raf.borrow_mut() = Some((id, cb)),
        Err(err) => web_sys::console::error_1(&err),
    }
}

/// One cityscape instance, owned by the embedding page.
#[wasm_bindgen]
pub struct Cityscape {
    state: Option<Rc<RefCell<AppState>>>,
    raf: RafSlot,
    context_lost_hook: Option<Closure<dyn FnMut(Event)>>,
    retired_frames: u32,
}

impl Default for Cityscape {
    fn default() -> Self {
        Self::new()
    }
}

#[wasm_bindgen]
impl Cityscape {
    #[wasm_bindgen(constructor)]
    pub fn new() -> Cityscape {
        Cityscape {
            state: None,
            raf: Rc::new(RefCell::new(None)),
            context_lost_hook: None,
            retired_frames: 0,
        }
    }

    /// Construct every component, attach a canvas to `mount`, and start the
    /// frame loop.
    ///
    /// Precondition: must not be called again without an intervening
    /// `destroy()`; a second call abandons the previous loop and leaks it.
    /// Fails when no WebGL context can be obtained; there is no retry path.
    pub fn init(&mut self, mount: &HtmlElement, width: u32, height: u32) -> Result<(), JsValue> {
        let win = web_sys::window().ok_or_else(|| JsValue::from_str("missing window"))?;
        let document = win
            .document()
            .ok_or_else(|| JsValue::from_str("missing document"))?;

        let canvas = document
            .create_element("canvas")?
            .dyn_into::<HtmlCanvasElement>()?;
        mount.append_child(&canvas)?;

        let gl = create_webgl_context(&canvas)?;
        let max_surface = gl
            .get_parameter(Gl::MAX_RENDERBUFFER_SIZE)?
            .as_f64()
            .unwrap_or(2048.0) as i32;

        let program = create_program(&gl, VERTEX_SHADER_SOURCE, FRAGMENT_SHADER_SOURCE)?;
        gl.use_program(Some(&program));

        let position_buffer = gl
            .create_buffer()
            .ok_or_else(|| JsValue::from_str("Unable to create position buffer"))?;
        let tex_coord_buffer = gl
            .create_buffer()
            .ok_or_else(|| JsValue::from_str("Unable to create tex coord buffer"))?;

        let a_position = gl.get_attrib_location(&program, "a_position");
        if a_position < 0 {
            return Err(JsValue::from_str("Missing a_position attribute"));
        }
        let a_position = a_position as u32;

        let a_tex_coord = gl.get_attrib_location(&program, "a_texCoord");
        if a_tex_coord < 0 {
            return Err(JsValue::from_str("Missing a_texCoord attribute"));
        }
        let a_tex_coord = a_tex_coord as u32;

        let u_texture = gl
            .get_uniform_location(&program, "u_texture")
            .ok_or_else(|| JsValue::from_str("Missing u_texture uniform"))?;
        gl.uniform1i(Some(&u_texture), 0);

        let texture = gl
            .create_texture()
            .ok_or_else(|| JsValue::from_str("Unable to create texture"))?;
        gl.bind_texture(Gl::TEXTURE_2D, Some(&texture));
        gl.tex_parameteri(Gl::TEXTURE_2D, Gl::TEXTURE_WRAP_S, Gl::CLAMP_TO_EDGE as i32);
        gl.tex_parameteri(Gl::TEXTURE_2D, Gl::TEXTURE_WRAP_T, Gl::CLAMP_TO_EDGE as i32);
        gl.tex_parameteri(Gl::TEXTURE_2D, Gl::TEXTURE_MIN_FILTER, Gl::LINEAR as i32);
        gl.tex_parameteri(Gl::TEXTURE_2D, Gl::TEXTURE_MAG_FILTER, Gl::LINEAR as i32);

        // The quad is static: the framebuffer always fills the viewport.
        let positions: [f32; 8] = [-1.0, 1.0, 1.0, 1.0, -1.0, -1.0, 1.0, -1.0];
        let tex_coords: [f32; 8] = [0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 1.0];

        let positions_array = js_sys::Float32Array::from(positions.as_ref());
        gl.bind_buffer(Gl::ARRAY_BUFFER, Some(&position_buffer));
        gl.buffer_data_with_array_buffer_view(Gl::ARRAY_BUFFER, &positions_array, Gl::STATIC_DRAW);

        let tex_coords_array = js_sys::Float32Array::from(tex_coords.as_ref());
        gl.bind_buffer(Gl::ARRAY_BUFFER, Some(&tex_coord_buffer));
        gl.buffer_data_with_array_buffer_view(Gl::ARRAY_BUFFER, &tex_coords_array, Gl::STATIC_DRAW);

        let seed = (js_sys::Math::random() * u32::MAX as f64) as u32;
        let scene = Corridor::new(CorridorConfig {
            seed,
            ..CorridorConfig::default()
        });

        let mut state = AppState {
            gl,
            program,
            position_buffer,
            tex_coord_buffer,
            texture,
            a_position,
            a_tex_coord,
            u_texture,
            canvas: canvas.clone(),
            document: document.clone(),
            frame: Pixmap::new(1, 1),
            scene,
            scheduler: FrameScheduler {
                running: true,
                last_timestamp: None,
                frames: 0,
            },
            context_lost: false,
            max_surface,
            last_gl_error: None,
        };
        update_surface(&mut state, width, height);
        set_status(&document, "running");

        let state = Rc::new(RefCell::new(state));

        let state_lost = Rc::clone(&state);
        let on_lost = Closure::wrap(Box::new(move |event: Event| {
            event.prevent_default();
            let mut st = state_lost.borrow_mut();
            st.context_lost = true;
            set_status(&st.document, "context-lost");
        }) as Box<dyn FnMut(_)>);
        canvas.add_event_listener_with_callback(
            "webglcontextlost",
            on_lost.as_ref().unchecked_ref(),
        )?;
        self.context_lost_hook = Some(on_lost);

        schedule_tick(&state, &self.raf);
        self.state = Some(state);
        Ok(())
    }

    /// Burst-spawn 2-4 signal streaks, staggered over the next few frames.
    /// Safe to call at any rate; requests beyond pool capacity are dropped.
    pub fn on_user_activity(&mut self) -> Result<(), JsValue> {
        let state = self
            .state
            .as_ref()
            .ok_or_else(|| JsValue::from_str("cityscape is not initialized"))?;
        state.borrow_mut().scene.on_user_activity();
        Ok(())
    }

    /// Adopt a new container size: canvas, viewport, and framebuffer.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<(), JsValue> {
        let state = self
            .state
            .as_ref()
            .ok_or_else(|| JsValue::from_str("cityscape is not initialized"))?;
        update_surface(&mut state.borrow_mut(), width, height);
        Ok(())
    }

    /// Stop the frame loop, cancel the pending frame request, detach
    /// listeners, and remove the canvas. Destroying twice is a no-op.
    pub fn destroy(&mut self) -> Result<(), JsValue> {
        let Some(state) = self.state.take() else {
            return Ok(());
        };

        if let Some((id, _closure)) = self.raf.borrow_mut().take() {
            let _ = window().cancel_animation_frame(id);
        }

        let mut st = state.borrow_mut();
        st.scheduler.running = false;
        self.retired_frames = st.scheduler.frames;
        if let Some(hook) = self.context_lost_hook.take() {
            let _ = st.canvas.remove_event_listener_with_callback(
                "webglcontextlost",
                hook.as_ref().unchecked_ref(),
            );
        }
        if let Some(parent) = st.canvas.parent_node() {
            let _ = parent.remove_child(&st.canvas);
        }
        set_status(&st.document, "destroyed");
        Ok(())
    }

    /// Render submissions so far; frozen once destroyed.
    pub fn frames_rendered(&self) -> u32 {
        self.state
            .as_ref()
            .map(|s| s.borrow().scheduler.frames)
            .unwrap_or(self.retired_frames)
    }
}

#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();
}
