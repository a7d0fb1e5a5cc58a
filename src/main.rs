//! meshpick CLI: inspect, transform, and pick PLY meshes.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use meshpick::{DVec3, IdGenerator, Ray, Scene, ply};

#[derive(Parser)]
#[command(name = "meshpick")]
#[command(version, about = "Load, transform, and ray-pick triangle meshes")]
struct Cli {
    /// More log output (-v debug, -vv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print vertex/triangle counts, bounds, and centroid.
    Info {
        /// Path to an ASCII PLY file.
        path: PathBuf,
    },

    /// Apply a transform and save the result with it baked in.
    Transform {
        input: PathBuf,
        output: PathBuf,

        /// Translation as x,y,z.
        #[arg(long, value_parser = parse_vec3, allow_hyphen_values = true)]
        translate: Option<DVec3>,

        /// Rotation in degrees about x,y,z, applied in that order around the centroid.
        #[arg(long, value_parser = parse_vec3, allow_hyphen_values = true)]
        rotate: Option<DVec3>,

        /// Scale added to the current factors (1 each), as x,y,z.
        #[arg(long, value_parser = parse_vec3, allow_hyphen_values = true)]
        scale: Option<DVec3>,
    },

    /// Cast a ray at a mesh and report the nearest hit.
    Pick {
        path: PathBuf,

        /// Ray origin as x,y,z; also used as the camera position.
        #[arg(long, value_parser = parse_vec3, allow_hyphen_values = true)]
        origin: DVec3,

        /// Ray direction as x,y,z.
        #[arg(long, value_parser = parse_vec3, allow_hyphen_values = true)]
        direction: DVec3,
    },
}

type CliResult = Result<(), Box<dyn std::error::Error>>;

fn parse_vec3(text: &str) -> Result<DVec3, String> {
    let parts: Vec<&str> = text.split(',').map(str::trim).collect();
    let [x, y, z] = parts.as_slice() else {
        return Err(format!("expected x,y,z, got {text:?}"));
    };
    let component = |s: &str| s.parse::<f64>().map_err(|e| format!("{s:?}: {e}"));
    Ok(DVec3::new(component(x)?, component(y)?, component(z)?))
}

fn info(path: &Path) -> CliResult {
    let ids = IdGenerator::new();
    let mesh = ply::load(path, &ids)?;

    println!("{}", mesh.name());
    println!("  vertices:  {}", mesh.vertex_count());
    println!("  triangles: {}", mesh.triangle_count());
    println!("  colors:    {}", if mesh.has_color() { "yes" } else { "no" });
    let c = mesh.centroid();
    println!("  centroid:  ({:.6}, {:.6}, {:.6})", c.x, c.y, c.z);
    match mesh.bounds() {
        Some(b) => {
            let (min, max) = (b.min(), b.max());
            println!(
                "  bounds:    ({:.6}, {:.6}, {:.6}) .. ({:.6}, {:.6}, {:.6})",
                min.x, min.y, min.z, max.x, max.y, max.z
            );
        }
        None => println!("  bounds:    empty"),
    }
    Ok(())
}

fn transform(
    input: &Path,
    output: &Path,
    translate: Option<DVec3>,
    rotate: Option<DVec3>,
    scale: Option<DVec3>,
) -> CliResult {
    let ids = IdGenerator::new();
    let mut mesh = ply::load(input, &ids)?;

    if let Some(degrees) = rotate {
        let r = degrees * std::f64::consts::PI / 180.0;
        mesh.rotate_by(r.x, r.y, r.z);
    }
    if let Some(s) = scale {
        mesh.scale_by(s.x, s.y, s.z);
    }
    if let Some(t) = translate {
        mesh.translate_by(t);
    }

    ply::save(output, &mesh)?;
    println!(
        "wrote {} ({} vertices, {} triangles)",
        output.display(),
        mesh.vertex_count(),
        mesh.triangle_count()
    );
    Ok(())
}

fn pick(path: &Path, origin: DVec3, direction: DVec3) -> CliResult {
    if direction == DVec3::ZERO {
        return Err("direction must not be zero".into());
    }

    let mut scene = Scene::new();
    scene.load_mesh(path)?;

    match scene.pick(&Ray::new(origin, direction), origin) {
        Some(found) => {
            let hit = found.hit;
            let name = scene.get(found.node)?.name().to_string();
            let [a, b, c] = *hit.triangle.vertices();
            println!("hit {name} triangle {}", hit.triangle_index);
            let p = hit.local_point;
            println!("  local point: ({:.6}, {:.6}, {:.6})", p.x, p.y, p.z);
            println!("  distance:    {:.6}", hit.camera_distance_sq.sqrt());
            for (label, v) in [("v0", a), ("v1", b), ("v2", c)] {
                println!("  {label}: ({:.6}, {:.6}, {:.6})", v.x, v.y, v.z);
            }
        }
        None => println!("no hit"),
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Commands::Info { path } => info(&path),
        Commands::Transform {
            input,
            output,
            translate,
            rotate,
            scale,
        } => transform(&input, &output, translate, rotate, scale),
        Commands::Pick {
            path,
            origin,
            direction,
        } => pick(&path, origin, direction),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn vectors_parse_with_or_without_spaces() {
        assert_eq!(parse_vec3("1,2,3").unwrap(), DVec3::new(1.0, 2.0, 3.0));
        assert_eq!(parse_vec3(" -1.5, 0 ,2e1").unwrap(), DVec3::new(-1.5, 0.0, 20.0));
        assert!(parse_vec3("1,2").is_err());
        assert!(parse_vec3("1,two,3").is_err());
    }

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn negative_vectors_are_accepted_as_values() {
        let cli = Cli::try_parse_from([
            "meshpick",
            "pick",
            "mesh.ply",
            "--origin",
            "0,0,5",
            "--direction",
            "-0,0,-1",
        ])
        .unwrap();
        match cli.command {
            Commands::Pick { direction, .. } => {
                assert_eq!(direction, DVec3::new(0.0, 0.0, -1.0))
            }
            _ => panic!("expected pick"),
        }
    }
}
