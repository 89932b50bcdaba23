//! Command lines for the external tools the archive drives.
//!
//! These only build [`Cmd`] values; running them is up to a [`CommandRunner`].
//!
//! [`CommandRunner`]: crate::shell::CommandRunner

use std::path::Path;

use crate::{
    config::Settings,
    shell::{quote, quote_path, Cmd},
};

/// GRIB2 to GRIB1.
pub fn cnvgrib_g21(settings: &Settings, input: &Path, output: &Path) -> Cmd {
    Cmd::new(&settings.cnvgrib).arg("-g21").arg(input).arg(output)
}

/// Interpolate GRIB1 onto NCEP grid number `grid`.
pub fn copygb_regrid(settings: &Settings, grid: u32, input: &Path, output: &Path) -> Cmd {
    Cmd::new(&settings.copygb)
        .arg(format!("-g{}", grid))
        .arg("-x")
        .arg(input)
        .arg(output)
}

/// Select GRIB2 records whose inventory matches `pattern`.
pub fn wgrib2_match(settings: &Settings, input: &Path, pattern: &str, output: &Path) -> Cmd {
    Cmd::new(&settings.wgrib2)
        .arg(input)
        .arg("-match")
        .arg(pattern)
        .arg("-grib")
        .arg(output)
}

/// Select GRIB1 records whose inventory line contains `text`.
///
/// wgrib reads the record list from stdin, so this is a shell pipeline.
pub fn wgrib_extract(settings: &Settings, input: &Path, text: &str, output: &Path) -> Cmd {
    let wgrib = quote_path(&settings.wgrib);
    let input = quote_path(input);
    Cmd::shell(format!(
        "{wgrib} {input} | grep {text} | {wgrib} {input} -i -grib -o {output}",
        wgrib = wgrib,
        input = input,
        text = quote(text),
        output = quote_path(output),
    ))
}

/// Bilinear remap of a NetCDF file onto the grid described in `grid_file`.
pub fn cdo_remapbil(grid_file: &Path, input: &Path, output: &Path) -> Cmd {
    Cmd::new("cdo")
        .arg(format!("remapbil,{}", grid_file.display()))
        .arg(input)
        .arg(output)
}

/// Fill the missing points of `primary` from `secondary`.
pub fn cdo_mergegrid(primary: &Path, secondary: &Path, output: &Path) -> Cmd {
    Cmd::new("cdo")
        .arg("-O")
        .arg("mergegrid")
        .arg(primary)
        .arg(secondary)
        .arg(output)
}

/// Ensemble mean of several NetCDF files.
pub fn ncea<P: AsRef<Path>>(inputs: &[P], output: &Path) -> Cmd {
    Cmd::new("ncea")
        .arg("-O")
        .args(inputs.iter().map(|p| p.as_ref()))
        .arg("-o")
        .arg(output)
}

/// Overwrite global character attributes in place.
pub fn ncatted_global(path: &Path, attributes: &[(&str, &str)]) -> Cmd {
    attributes
        .iter()
        .fold(Cmd::new("ncatted").arg("-O"), |cmd, (name, value)| {
            cmd.arg("-a").arg(format!("{},global,o,c,{}", name, value))
        })
        .arg(path)
}

/// Apply an ncap2 arithmetic script to `input`, writing `output`.
pub fn ncap2(script: &str, input: &Path, output: &Path) -> Cmd {
    Cmd::new("ncap2")
        .arg("-O")
        .arg("-s")
        .arg(script)
        .arg(input)
        .arg(output)
}

/// Apply an ncap2 arithmetic script to a file in place.
pub fn ncap2_in_place(script: &str, path: &Path) -> Cmd {
    ncap2(script, path, path)
}

/// Run one `hsi` command.
pub fn hsi(command: String) -> Cmd {
    Cmd::new("hsi").arg(command)
}

/// Copy a local file to HPSS.
pub fn hsi_put(local: &Path, remote: &str) -> Cmd {
    Cmd::new("hsi").arg("put").arg(local).arg(":").arg(remote)
}

/// Bundle `members`, relative to `dir`, into an HPSS tarball.
pub fn htar_create<P: AsRef<Path>>(tarball: &str, dir: &Path, members: &[P]) -> Cmd {
    Cmd::new("htar")
        .arg("-cvf")
        .arg(tarball)
        .args(members.iter().map(|p| p.as_ref()))
        .current_dir(dir)
}

/// Extract `members`, or everything when empty, from an HPSS tarball into `dir`.
pub fn htar_extract(tarball: &str, dir: &Path, members: &[&str]) -> Cmd {
    Cmd::new("htar")
        .arg("-xvf")
        .arg(tarball)
        .args(members)
        .current_dir(dir)
}

/// Bundle `members`, relative to `dir`, into a local tarball.
pub fn tar_create<P: AsRef<Path>>(tarball: &Path, dir: &Path, members: &[P]) -> Cmd {
    Cmd::new("tar")
        .arg("-cvf")
        .arg(tarball)
        .args(members.iter().map(|p| p.as_ref()))
        .current_dir(dir)
}

/// Unpack a local tarball into `dir`.
pub fn tar_extract(tarball: &Path, dir: &Path) -> Cmd {
    Cmd::new("tar").arg("-xvf").arg(tarball).arg("-C").arg(dir)
}

/// Download `url` to `output`.
pub fn wget(url: &str, output: &Path) -> Cmd {
    Cmd::new("wget").arg("-O").arg(output).arg(url)
}

/// Fetch `remote` from an FTP server with lftp.
pub fn lftp_get(host: &str, dir: &str, remote: &str, output: &Path) -> Cmd {
    Cmd::new("lftp").arg("-c").arg(format!(
        "open {}; cd {}; get {} -o {}",
        host,
        dir,
        remote,
        quote_path(output)
    ))
}

/// Run a command line on another host.
pub fn ssh(destination: &str, remote_command: String) -> Cmd {
    Cmd::new("ssh").arg(destination).arg(remote_command)
}

#[cfg(test)]
mod unit {
    use super::*;

    use std::path::PathBuf;

    #[test]
    fn test_grib_commands() {
        let settings = Settings::defaults("/home/ga");
        let cmd = cnvgrib_g21(&settings, Path::new("in"), Path::new("out"));
        assert_eq!(cmd.argv()[1..], ["-g21", "in", "out"]);

        let cmd = copygb_regrid(&settings, 3, Path::new("in"), Path::new("out"));
        assert_eq!(cmd.argv()[1..], ["-g3", "-x", "in", "out"]);

        let cmd = wgrib2_match(
            &settings,
            Path::new("in"),
            "(:PRATE:surface:)|(:TMP:2 m above ground:)",
            Path::new("out"),
        );
        assert!(!cmd.is_shell());
        assert_eq!(cmd.argv()[3], "(:PRATE:surface:)|(:TMP:2 m above ground:)");
    }

    #[test]
    fn test_wgrib_extract_quotes() {
        let mut settings = Settings::defaults("/home/ga");
        settings.wgrib = PathBuf::from("/opt/wgrib");

        let cmd = wgrib_extract(
            &settings,
            Path::new("/run dir/jma_n"),
            ":anl",
            Path::new("tmp.n.f000.2024011500"),
        );
        assert!(cmd.is_shell());
        assert_eq!(
            cmd.to_string(),
            "/opt/wgrib '/run dir/jma_n' | grep :anl | /opt/wgrib '/run dir/jma_n' -i -grib -o \
             tmp.n.f000.2024011500"
        );
    }

    #[test]
    fn test_archive_commands() {
        let cmd = htar_create("/NCEPDEV/x/gfs00_202401.tar", Path::new("/arch/gfs"), &["a", "b"]);
        assert_eq!(
            cmd.argv(),
            vec!["htar", "-cvf", "/NCEPDEV/x/gfs00_202401.tar", "a", "b"]
        );
        assert_eq!(cmd.cwd(), Some(Path::new("/arch/gfs")));

        let cmd = hsi("mkdir -p /NCEPDEV/x".to_owned());
        assert_eq!(cmd.argv(), vec!["hsi", "mkdir -p /NCEPDEV/x"]);

        let cmd = ncatted_global(Path::new("f.nc"), &[("area", "Global"), ("x", "1")]);
        assert_eq!(
            cmd.argv(),
            vec!["ncatted", "-O", "-a", "area,global,o,c,Global", "-a", "x,global,o,c,1", "f.nc"]
        );

        let cmd = lftp_get("ftp://h", "pub", "2024/f.nc", Path::new("/run/f.nc"));
        assert_eq!(cmd.argv()[2], "open ftp://h; cd pub; get 2024/f.nc -o /run/f.nc");
    }
}
