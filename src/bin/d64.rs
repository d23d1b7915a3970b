extern crate clap;
extern crate d64;

use std::path::Path;
use std::process;

use clap::{App, AppSettings, Arg, SubCommand};

use d64::disk::image;
use d64::{normalize_filename, Disk, Result};

// Possible exit codes
static _EXIT_SUCCESS: i32 = 0;
static EXIT_FAILURE: i32 = 1;

fn main() {
    // Parse command-line arguments
    let app = App::new("1541 Disk Image Utility")
        .version("0.3.0")
        .about("Create, fill, list, and extract D64 disk images.")
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .arg(Arg::with_name("diskimage").required(true))
        .subcommand(
            SubCommand::with_name("new")
                .about("Create a freshly formatted disk image.")
                .arg(Arg::with_name("label").required(true))
                .arg(Arg::with_name("id").required(true))
                .arg(
                    Arg::with_name("interleave")
                        .short("i")
                        .long("interleave")
                        .takes_value(true)
                        .default_value("10")
                        .validator(interleave_validator)
                        .help("Sector interleave used when writing files"),
                )
                .arg(
                    Arg::with_name("prg")
                        .multiple(true)
                        .help("PRG files to store on the new image"),
                ),
        )
        .subcommand(
            SubCommand::with_name("add")
                .about("Add PRG files to an existing disk image.")
                .arg(Arg::with_name("prg").required(true).multiple(true)),
        )
        .subcommand(
            SubCommand::with_name("extract")
                .about("Extract every PRG file from a disk image.")
                .arg(Arg::with_name("outdir").required(false)),
        )
        .subcommand(SubCommand::with_name("dir").about("Show a directory listing."))
        .subcommand(SubCommand::with_name("bam").about("Show the Block Availability Map."))
        .subcommand(
            SubCommand::with_name("validate")
                .about("Rebuild the BAM from the directory and save the image."),
        );

    let mut app_clone = app.clone();
    let matches = app.get_matches();

    let diskimage = matches.value_of("diskimage").unwrap();
    let result = match matches.subcommand() {
        ("new", Some(m)) => cmd_new(
            diskimage,
            m.value_of("label").unwrap(),
            m.value_of("id").unwrap(),
            m.value_of("interleave").unwrap().parse::<u8>().unwrap(),
            &m.values_of("prg").map(|v| v.collect()).unwrap_or_default(),
        ),
        ("add", Some(m)) => cmd_add(diskimage, &m.values_of("prg").unwrap().collect::<Vec<_>>()),
        ("extract", Some(m)) => cmd_extract(diskimage, m.value_of("outdir").unwrap_or(".")),
        ("dir", Some(_)) => cmd_dir(diskimage),
        ("bam", Some(_)) => cmd_bam(diskimage),
        ("validate", Some(_)) => cmd_validate(diskimage),
        _ => {
            app_clone.print_help().unwrap();
            println!();
            process::exit(EXIT_FAILURE);
        }
    };
    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(EXIT_FAILURE);
    }
}

/// Require an interleave argument in the range 1-20.
fn interleave_validator(v: String) -> std::result::Result<(), String> {
    match v.parse::<u8>() {
        Ok(n) if (1..=20).contains(&n) => Ok(()),
        _ => Err("Expected a value from 1-20.".to_string()),
    }
}

/// Derive the on-disk filename for a host PRG path: the base name,
/// normalized, without its `.prg` extension.
fn disk_filename(path: &str) -> String {
    let path = Path::new(path);
    let is_prg = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.eq_ignore_ascii_case("prg"))
        .unwrap_or(false);
    let base = if is_prg {
        path.file_stem()
    } else {
        path.file_name()
    };
    normalize_filename(base.and_then(|b| b.to_str()).unwrap_or_default())
}

fn cmd_new(
    diskimage: &str,
    label: &str,
    id: &str,
    interleave: u8,
    prgs: &Vec<&str>,
) -> Result<()> {
    let mut disk = Disk::new(label, id, interleave);
    for prg in prgs {
        image::add_file(&mut disk, prg, &disk_filename(prg))?;
    }
    image::save(&disk, diskimage)?;
    println!("created {:?} with {} files", diskimage, prgs.len());
    Ok(())
}

fn cmd_add(diskimage: &str, prgs: &Vec<&str>) -> Result<()> {
    let mut disk = image::open(diskimage)?;
    for prg in prgs {
        image::add_file(&mut disk, prg, &disk_filename(prg))?;
    }
    image::save(&disk, diskimage)?;
    println!("added {} files to {:?}", prgs.len(), diskimage);
    Ok(())
}

fn cmd_extract(diskimage: &str, outdir: &str) -> Result<()> {
    let disk = image::open(diskimage)?;
    for path in image::extract_to_dir(&disk, outdir)? {
        println!("{}", path.display());
    }
    Ok(())
}

fn cmd_dir(diskimage: &str) -> Result<()> {
    let disk = image::open(diskimage)?;
    print!("{}", disk);
    Ok(())
}

fn cmd_bam(diskimage: &str) -> Result<()> {
    let disk = image::open(diskimage)?;
    print!("{:?}", disk.bam());
    Ok(())
}

fn cmd_validate(diskimage: &str) -> Result<()> {
    let mut disk = image::open(diskimage)?;
    disk.validate();
    image::save(&disk, diskimage)?;
    println!("rebuilt BAM on {:?}", diskimage);
    Ok(())
}
