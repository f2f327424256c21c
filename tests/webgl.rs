//! In-browser tests for the platform glue: context acquisition, frame
//! texture upload, and the init/destroy lifecycle.

#![cfg(target_arch = "wasm32")]

use cityscape::pixmap::Pixmap;
use cityscape::Cityscape;
use wasm_bindgen::JsCast;
use wasm_bindgen_test::*;
use web_sys::{HtmlCanvasElement, HtmlElement, WebGlRenderingContext as Gl};

wasm_bindgen_test_configure!(run_in_browser);

fn document() -> web_sys::Document {
    web_sys::window().expect("no window").document().expect("no document")
}

fn mount_div() -> HtmlElement {
    let document = document();
    let div = document
        .create_element("div")
        .expect("create div")
        .dyn_into::<HtmlElement>()
        .expect("div element");
    document.body().expect("no body").append_child(&div).expect("append");
    div
}

async fn sleep(ms: i32) {
    let promise = js_sys::Promise::new(&mut |resolve, _reject| {
        web_sys::window()
            .expect("no window")
            .set_timeout_with_callback_and_timeout_and_arguments_0(&resolve, ms)
            .expect("set_timeout");
    });
    wasm_bindgen_futures::JsFuture::from(promise)
        .await
        .expect("sleep");
}

#[wasm_bindgen_test]
fn webgl_context_available() {
    let canvas = document()
        .create_element("canvas")
        .expect("create canvas")
        .dyn_into::<HtmlCanvasElement>()
        .expect("canvas element");

    let gl = canvas
        .get_context("webgl")
        .expect("get context")
        .expect("webgl context")
        .dyn_into::<Gl>()
        .expect("cast webgl");

    assert!(gl.get_error() == Gl::NO_ERROR);
}

#[wasm_bindgen_test]
fn webgl_can_upload_a_frame_sized_texture() {
    let canvas = document()
        .create_element("canvas")
        .expect("create canvas")
        .dyn_into::<HtmlCanvasElement>()
        .expect("canvas element");

    let gl = canvas
        .get_context("webgl")
        .expect("get context")
        .expect("webgl context")
        .dyn_into::<Gl>()
        .expect("cast webgl");

    let texture = gl.create_texture().expect("create texture");
    gl.bind_texture(Gl::TEXTURE_2D, Some(&texture));
    gl.tex_parameteri(Gl::TEXTURE_2D, Gl::TEXTURE_WRAP_S, Gl::CLAMP_TO_EDGE as i32);
    gl.tex_parameteri(Gl::TEXTURE_2D, Gl::TEXTURE_WRAP_T, Gl::CLAMP_TO_EDGE as i32);
    gl.tex_parameteri(Gl::TEXTURE_2D, Gl::TEXTURE_MIN_FILTER, Gl::LINEAR as i32);
    gl.tex_parameteri(Gl::TEXTURE_2D, Gl::TEXTURE_MAG_FILTER, Gl::LINEAR as i32);

    let mut frame = Pixmap::new(64, 36);
    frame.clear([10, 10, 18, 255]);
    let result = gl.tex_image_2d_with_i32_and_i32_and_i32_and_format_and_type_and_opt_u8_array(
        Gl::TEXTURE_2D,
        0,
        Gl::RGBA as i32,
        frame.width() as i32,
        frame.height() as i32,
        0,
        Gl::RGBA,
        Gl::UNSIGNED_BYTE,
        Some(frame.pixels()),
    );

    assert!(result.is_ok());
    assert!(gl.get_error() == Gl::NO_ERROR);
}

#[wasm_bindgen_test]
fn calls_before_init_are_precondition_errors() {
    let mut city = Cityscape::new();
    assert!(city.on_user_activity().is_err());
    assert!(city.resize(320, 180).is_err());
    assert_eq!(city.frames_rendered(), 0);
}

#[wasm_bindgen_test]
fn init_attaches_a_canvas_and_reports_running() {
    let mount = mount_div();
    let mut city = Cityscape::new();
    city.init(&mount, 320, 180).expect("init");

    let child = mount.first_element_child().expect("canvas attached");
    assert_eq!(child.tag_name().to_ascii_lowercase(), "canvas");
    let status = document()
        .document_element()
        .and_then(|el| el.get_attribute("data-cityscape-status"));
    assert_eq!(status.as_deref(), Some("running"));

    city.on_user_activity().expect("activity while running");
    city.resize(200, 320).expect("resize while running");
    city.destroy().expect("destroy");
}

#[wasm_bindgen_test]
async fn destroy_stops_render_submissions() {
    let mount = mount_div();
    let mut city = Cityscape::new();
    city.init(&mount, 320, 180).expect("init");

    sleep(200).await;
    city.destroy().expect("destroy");
    let frames = city.frames_rendered();
    assert!(frames > 0, "the loop should have rendered before teardown");
    assert!(mount.first_element_child().is_none(), "canvas released");

    // Advancing the clock after destroy must not submit another frame.
    sleep(200).await;
    assert_eq!(city.frames_rendered(), frames);

    let status = document()
        .document_element()
        .and_then(|el| el.get_attribute("data-cityscape-status"));
    assert_eq!(status.as_deref(), Some("destroyed"));

    // Destroying twice is a documented no-op.
    city.destroy().expect("second destroy");
    assert!(city.on_user_activity().is_err(), "destroyed handle rejects calls");
}
