//! Demo: a slowly spinning triangle.

use anyhow::Result;
use glam::{Mat4, Vec3};
use tracing::warn;

use glint_engine::{run, EngineConfig, Vertex};

fn main() -> Result<()> {
    glint_core::init_logging();

    let triangle = [
        Vertex::new(Vec3::new(0.0, -0.5, 0.0), Vec3::new(1.0, 0.0, 0.0)),
        Vertex::new(Vec3::new(0.5, 0.5, 0.0), Vec3::new(0.0, 1.0, 0.0)),
        Vertex::new(Vec3::new(-0.5, 0.5, 0.0), Vec3::new(0.0, 0.0, 1.0)),
    ];

    let config = EngineConfig {
        title: "glint demo".to_string(),
        ..Default::default()
    };

    let mut uploaded = false;
    let mut angle = 0.0f32;

    run(config, move |engine, delta| {
        if !uploaded {
            engine.set_clear_color([0.02, 0.02, 0.08, 1.0]);
            if let Err(e) = engine.set_vertices(&triangle) {
                warn!(error = %e, "Vertex upload failed");
            }
            uploaded = true;
        }

        angle += delta * 0.5;
        if let Err(e) = engine.set_view_matrix(Mat4::from_rotation_z(angle)) {
            warn!(error = %e, "View matrix upload failed");
        }
    })?;

    Ok(())
}
