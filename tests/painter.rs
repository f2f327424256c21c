//! Native tests for the pixel surface and the scene painter.

use cityscape::corridor::{Camera, Corridor, CorridorConfig};
use cityscape::painter::{fog_visibility, paint_scene, Projector};
use cityscape::pixmap::Pixmap;

fn camera() -> Camera {
    Camera {
        x: 0.0,
        y: 6.0,
        z: 0.0,
        yaw: 0.0,
        pitch: 0.0,
    }
}

#[test]
fn projector_centers_the_forward_axis() {
    let proj = Projector::new(&camera(), 200, 100);
    let (p, dist) = proj.project(0.0, 6.0, -10.0).expect("in front");
    assert!((p[0] - 100.0).abs() < 1e-9);
    assert!((p[1] - 50.0).abs() < 1e-9);
    assert!((dist - 10.0).abs() < 1e-9);

    // Right of the axis lands right of center, above lands above.
    let (right, _) = proj.project(2.0, 6.0, -10.0).unwrap();
    assert!(right[0] > 100.0);
    let (up, _) = proj.project(0.0, 8.0, -10.0).unwrap();
    assert!(up[1] < 50.0);
}

#[test]
fn projector_rejects_points_behind_the_camera() {
    let proj = Projector::new(&camera(), 200, 100);
    assert!(proj.project(0.0, 6.0, 10.0).is_none());
    assert!(proj.project(0.0, 6.0, 0.0).is_none());
}

#[test]
fn perspective_shrinks_with_distance() {
    let proj = Projector::new(&camera(), 200, 100);
    let (near, _) = proj.project(2.0, 6.0, -10.0).unwrap();
    let (far, _) = proj.project(2.0, 6.0, -100.0).unwrap();
    assert!((near[0] - 100.0) > (far[0] - 100.0));
}

#[test]
fn fog_thickens_with_depth() {
    assert!((fog_visibility(0.0) - 1.0).abs() < 1e-12);
    assert!(fog_visibility(100.0) > fog_visibility(300.0));
    assert!(fog_visibility(1000.0) < 0.01);
}

#[test]
fn blend_modes() {
    let mut map = Pixmap::new(2, 2);
    map.clear([0, 0, 0, 255]);

    map.put(0, 0, [200, 0, 0, 255]);
    assert_eq!(map.sample(0, 0), [200, 0, 0, 255]);

    // Alpha-over at half strength mixes toward the source.
    map.blend(0, 0, [0, 200, 0, 128]);
    let px = map.sample(0, 0);
    assert!(px[0] > 90 && px[0] < 110);
    assert!(px[1] > 90 && px[1] < 110);

    // Additive saturates instead of wrapping.
    map.put(1, 1, [200, 200, 200, 255]);
    map.blend_add(1, 1, [200, 200, 200, 255]);
    assert_eq!(map.sample(1, 1), [255, 255, 255, 255]);

    // Out-of-bounds writes are ignored.
    map.put(-1, 5, [1, 2, 3, 255]);
    map.blend(7, -2, [1, 2, 3, 255]);
}

#[test]
fn fade_toward_dims_without_clearing() {
    let mut map = Pixmap::new(1, 1);
    map.put(0, 0, [240, 240, 240, 255]);
    map.fade_toward([10, 10, 18], 31);
    let px = map.sample(0, 0);
    assert!(px[0] < 240 && px[0] > 180);
}

#[test]
fn triangle_fill_covers_interior_only() {
    let mut map = Pixmap::new(20, 20);
    map.clear([0, 0, 0, 255]);
    map.fill_triangle([[2.0, 2.0], [18.0, 2.0], [2.0, 18.0]], [255, 255, 255], 1.0);
    assert_eq!(map.sample(5, 5), [255, 255, 255, 255]);
    assert_eq!(map.sample(17, 17), [0, 0, 0, 255]);

    // Reversed winding still fills.
    let mut map2 = Pixmap::new(20, 20);
    map2.clear([0, 0, 0, 255]);
    map2.fill_triangle([[2.0, 18.0], [18.0, 2.0], [2.0, 2.0]], [255, 255, 255], 1.0);
    assert_eq!(map2.sample(5, 5), [255, 255, 255, 255]);
}

#[test]
fn textured_triangle_applies_tint() {
    let mut tex = Pixmap::new(2, 2);
    tex.clear([100, 200, 100, 255]);

    let mut map = Pixmap::new(16, 16);
    map.clear([0, 0, 0, 255]);
    map.fill_triangle_textured(
        [[0.0, 0.0], [15.0, 0.0], [0.0, 15.0]],
        [[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]],
        &tex,
        [1.0, 0.5, 1.0],
        1.0,
    );
    let px = map.sample(3, 3);
    assert_eq!(px[0], 100);
    assert_eq!(px[1], 100);
    assert_eq!(px[2], 100);
}

#[test]
fn offscreen_strokes_touch_nothing() {
    let mut map = Pixmap::new(10, 10);
    map.clear([0, 0, 0, 255]);
    map.stroke_line(-50.0, -50.0, -10.0, -2.0, [255, 255, 255], 1.0, 1.0, false);
    assert!(map.pixels().chunks_exact(4).all(|px| px[0] == 0 && px[1] == 0));

    map.stroke_line(-5.0, 5.0, 15.0, 5.0, [255, 255, 255], 1.0, 1.0, false);
    assert_eq!(map.sample(5, 5), [255, 255, 255, 255]);
}

#[test]
fn blit_scaled_centers_the_sprite() {
    let mut sprite = Pixmap::new(4, 4);
    sprite.clear([250, 0, 0, 255]);

    let mut map = Pixmap::new(11, 11);
    map.clear([0, 0, 0, 255]);
    map.blit_scaled(&sprite, 5, 5, 4, 4, 1.0);
    assert_eq!(map.sample(5, 5), [250, 0, 0, 255]);
    assert_eq!(map.sample(0, 0), [0, 0, 0, 255]);
}

#[test]
fn paint_scene_renders_something_every_frame() {
    let mut scene = Corridor::new(CorridorConfig::default());
    let mut frame = Pixmap::new(320, 180);

    for _ in 0..30 {
        scene.advance(1.0 / 60.0);
    }
    scene.on_user_activity();
    scene.advance(1.0 / 60.0);
    paint_scene(&mut frame, &scene);

    let background = frame
        .pixels()
        .chunks_exact(4)
        .filter(|px| px[0] == 10 && px[1] == 10 && px[2] == 18)
        .count();
    let total = frame.width() * frame.height();
    assert!(background < total, "the scene must draw over the backdrop");
    // The horizon sun and ground grid should light a meaningful share.
    assert!(total - background > total / 50);
}

#[test]
fn paint_scene_stays_stable_over_a_long_run() {
    let mut scene = Corridor::new(CorridorConfig {
        texture_refresh_interval: f64::MAX,
        ..CorridorConfig::default()
    });
    let mut frame = Pixmap::new(160, 90);
    for _ in 0..600 {
        scene.advance(1.0 / 30.0);
    }
    paint_scene(&mut frame, &scene);
    assert_eq!(frame.pixels().len(), 160 * 90 * 4);
}
