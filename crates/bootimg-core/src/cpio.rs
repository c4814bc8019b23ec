//! # newc cpio Writer
//!
//! Minimal writer for the SVR4 "newc" cpio format (magic `070701`), the
//! format the Linux kernel unpacks from an initramfs. Archives may be
//! concatenated onto an existing initramfs; the kernel unpacks each in turn.
//!
//! Layout of each record: a 110-byte ASCII header of thirteen 8-digit hex
//! fields, the NUL-terminated name padded to a 4-byte boundary, then the
//! file data padded to a 4-byte boundary. The archive ends with a
//! `TRAILER!!!` record.

const MAGIC: &str = "070701";
const HEADER_LEN: usize = 110;
const TRAILER_NAME: &str = "TRAILER!!!";

/// Regular file type bits.
const S_IFREG: u32 = 0o100000;

/// One regular file to place in an archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CpioEntry<'a> {
    /// Path inside the archive, without a leading `/`.
    pub name: &'a str,
    /// Permission bits (the regular-file type bits are added).
    pub mode: u32,
    /// File contents.
    pub data: &'a [u8],
}

/// Build a complete newc archive holding `entries`.
pub fn newc_archive(entries: &[CpioEntry<'_>]) -> Vec<u8> {
    let capacity = entries
        .iter()
        .map(|e| HEADER_LEN + e.name.len() + e.data.len() + 8)
        .sum::<usize>()
        + HEADER_LEN
        + TRAILER_NAME.len()
        + 8;
    let mut out = Vec::with_capacity(capacity);

    for (index, entry) in entries.iter().enumerate() {
        let ino = u32::try_from(index + 1).unwrap_or(u32::MAX);
        write_record(&mut out, ino, S_IFREG | (entry.mode & 0o7777), 1, entry.name, entry.data);
    }
    write_record(&mut out, 0, 0, 1, TRAILER_NAME, &[]);
    out
}

fn write_record(out: &mut Vec<u8>, ino: u32, mode: u32, nlink: u32, name: &str, data: &[u8]) {
    // Sizes above u32::MAX cannot be represented in newc; payloads here are
    // configuration files far below that.
    let filesize = u32::try_from(data.len()).unwrap_or(u32::MAX);
    let namesize = u32::try_from(name.len() + 1).unwrap_or(u32::MAX);
    let fields: [u32; 13] = [
        ino,
        mode,
        0, // uid
        0, // gid
        nlink,
        0, // mtime
        filesize,
        0, // devmajor
        0, // devminor
        0, // rdevmajor
        0, // rdevminor
        namesize,
        0, // check
    ];

    out.extend_from_slice(MAGIC.as_bytes());
    for field in fields {
        out.extend_from_slice(format!("{field:08x}").as_bytes());
    }
    out.extend_from_slice(name.as_bytes());
    out.push(0);
    pad4(out);
    out.extend_from_slice(data);
    pad4(out);
}

fn pad4(out: &mut Vec<u8>) {
    while out.len() % 4 != 0 {
        out.push(0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field(header: &[u8], index: usize) -> u32 {
        let start = MAGIC.len() + index * 8;
        let hex = std::str::from_utf8(&header[start..start + 8]).unwrap();
        u32::from_str_radix(hex, 16).unwrap()
    }

    #[test]
    fn single_file_layout() {
        let archive = newc_archive(&[CpioEntry {
            name: "config.ign",
            mode: 0o644,
            data: b"{\"ignition\":{}}",
        }]);

        assert_eq!(&archive[..6], b"070701");
        assert_eq!(archive.len() % 4, 0);
        assert_eq!(field(&archive, 1), 0o100644);
        assert_eq!(field(&archive, 6), 15);
        assert_eq!(field(&archive, 11), 11);

        // Name starts right after the header; data after the padded name.
        assert_eq!(&archive[HEADER_LEN..HEADER_LEN + 10], b"config.ign");
        let data_start = (HEADER_LEN + 11 + 3) / 4 * 4;
        assert_eq!(&archive[data_start..data_start + 15], b"{\"ignition\":{}}");
    }

    #[test]
    fn archive_ends_with_trailer() {
        let archive = newc_archive(&[]);
        assert_eq!(&archive[..6], b"070701");
        assert_eq!(&archive[HEADER_LEN..HEADER_LEN + 10], TRAILER_NAME.as_bytes());
        assert_eq!(archive.len(), (HEADER_LEN + TRAILER_NAME.len() + 1 + 3) / 4 * 4);
    }

    #[test]
    fn mode_type_bits_are_forced() {
        let archive = newc_archive(&[CpioEntry {
            name: "x",
            mode: 0o040755,
            data: b"",
        }]);
        assert_eq!(field(&archive, 1), 0o100755);
    }
}
