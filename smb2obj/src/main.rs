use std::error::Error;
use std::io::Write;
use std::process::ExitCode;
use std::time::Instant;

use smb_lib::{extract_geometry, MeshHeader};

mod obj;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();
    if args.len() != 3 {
        eprintln!("Usage:");
        eprintln!("\tsmb2obj <input.smb> <output.obj>");
        return ExitCode::FAILURE;
    }

    match convert(&args[1], &args[2]) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("Error: {}", error);
            ExitCode::FAILURE
        }
    }
}

fn convert(input: &str, output: &str) -> Result<(), Box<dyn Error>> {
    let data = std::fs::read(input)?;
    println!("Loaded {} ({} bytes)", input, data.len());

    let decode_start = Instant::now();
    let header = MeshHeader::read(&data)?;
    println!(
        "Submeshes: {}, materials: {}",
        header.submeshes.len(),
        header.materials.len()
    );
    for (i, submesh) in header.submeshes.iter().enumerate() {
        println!(
            "  Submesh {}: {} (verts: {}, faces: {}, stride: {})",
            i + 1,
            submesh.name,
            submesh.vertex_count,
            submesh.face_count,
            submesh.vertex_stride
        );
    }
    for warning in &header.warnings {
        eprintln!("Warning: {}", warning);
    }

    let submeshes = extract_geometry(&data, &header)?;
    eprintln!("Decode: {:?}", decode_start.elapsed());

    let export_start = Instant::now();
    let file = std::fs::File::create(output)?;
    let mut writer = std::io::BufWriter::new(file);
    obj::write_obj(&mut writer, &submeshes)?;
    writer.flush()?;
    eprintln!("Export: {:?}", export_start.elapsed());

    println!("Exported {}", output);
    Ok(())
}
