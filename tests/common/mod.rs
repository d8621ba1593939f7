// tests/common/mod.rs - Support bundle fixtures shared by the integration tests
#![allow(dead_code)]

use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

pub const HOSTD_LOGIN: &str = "2024-01-01T10:00:00Z info hostd[2099401] [Originator@6876 sub=Vimsvc.ha-eventmgr] Event 113 : Accepted password for user root from 192.168.1.10";
pub const HOSTD_NOISE: &str = "2024-01-01T10:00:01Z verbose hostd[2099401] [Originator@6876 sub=PropertyProvider] RecordOp ASSIGN: info, haTask";
pub const SYSLOG_LOGIN: &str = "2024-01-02T08:15:00Z sftp-server[3001]: User root logged in";
pub const AUTH_LOGIN: &str = "2024-01-02T08:20:00Z sshd[2201]: Accepted keyboard-interactive/pam for root from 10.0.0.5 port 51514 ssh2";
pub const AUTH_BAD_TIMESTAMP: &str = "2024-13-45T99:00:00Z sshd[2202]: Session opened for 'root' on /dev/char/pty/t0";
pub const SHELL_COMMAND: &str = "2024-01-02T08:21:00Z shell[3100]: [root]: esxcli network firewall set --enabled false";

pub fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

pub fn tar_bytes(files: &[(&str, Vec<u8>)]) -> Vec<u8> {
    let mut builder = tar::Builder::new(Vec::new());
    for (name, contents) in files {
        let mut header = tar::Header::new_ustar();
        header.set_size(contents.len() as u64);
        header.set_mode(0o644);
        header.set_cksum();
        builder.append_data(&mut header, name, contents.as_slice()).unwrap();
    }
    builder.into_inner().unwrap()
}

/// Write `<dir>/<name>` as a gzip-compressed tar of `files`
pub fn write_tgz(dir: &Path, name: &str, files: &[(&str, Vec<u8>)]) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, gzip(&tar_bytes(files))).unwrap();
    path
}

pub fn write_zip(dir: &Path, name: &str, files: &[(&str, Vec<u8>)]) -> PathBuf {
    let path = dir.join(name);
    let mut writer = zip::ZipWriter::new(File::create(&path).unwrap());
    for (entry, contents) in files {
        writer
            .start_file(*entry, zip::write::SimpleFileOptions::default())
            .unwrap();
        writer.write_all(contents).unwrap();
    }
    writer.finish().unwrap();
    path
}

/// Lines joined with trailing newlines
pub fn log(lines: &[&str]) -> Vec<u8> {
    let mut text = lines.join("\n");
    text.push('\n');
    text.into_bytes()
}

/// Every row of a delimited table, header included
pub fn read_table(path: &Path, delimiter: u8) -> Vec<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .delimiter(delimiter)
        .from_path(path)
        .unwrap_or_else(|e| panic!("cannot read {}: {}", path.display(), e));
    reader
        .records()
        .map(|row| row.unwrap().iter().map(String::from).collect())
        .collect()
}

pub fn column(table: &[Vec<String>], name: &str) -> usize {
    table[0]
        .iter()
        .position(|c| c == name)
        .unwrap_or_else(|| panic!("no column {} in {:?}", name, table[0]))
}
