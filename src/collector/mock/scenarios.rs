//! Pre-built mock filesystem scenarios for testing.
//!
//! These scenarios provide realistic `/proc` states for both counter
//! layouts: a current kernel exposing `/proc/diskstats`, and an old kernel
//! exposing statistics through `/proc/partitions`.

use super::filesystem::MockFs;

/// `/proc/cpuinfo` with `n` processors.
pub(crate) fn cpuinfo(n: usize) -> String {
    let mut out = String::new();
    for i in 0..n {
        out.push_str(&format!(
            "processor\t: {i}\nvendor_id\t: GenuineIntel\nmodel name\t: Mock CPU @ 2.40GHz\ncpu MHz\t\t: 2400.000\n\n"
        ));
    }
    out
}

impl MockFs {
    /// Creates a system with `/proc/diskstats` (modern layout) and 4 CPUs.
    ///
    /// Devices: `hda` (IDE, with a reduced-shape partition `hda1`), `sda`
    /// (SCSI, with partition `sda1`), idle `sdb`, idle `loop0`, and
    /// `nvme0n1` with partition `nvme0n1p1` (unknown class, always visible).
    pub fn modern_system() -> Self {
        let fs = Self::new();

        fs.add_file("/proc/cpuinfo", cpuinfo(4));
        fs.add_file(
            "/proc/stat",
            "\
cpu  10000 500 3000 80000 1000 200 100 0 0 0
cpu0 2500 125 750 20000 250 50 25 0 0 0
cpu1 2500 125 750 20000 250 50 25 0 0 0
cpu2 2500 125 750 20000 250 50 25 0 0 0
cpu3 2500 125 750 20000 250 50 25 0 0 0
intr 1000000 50 0 0 0 0 0 0 0 1 0 0 0 100 0 0 1000
ctxt 500000
btime 1700000000
processes 10000
procs_running 2
procs_blocked 0
",
        );
        fs.add_file(
            "/proc/diskstats",
            "\
   3       0 hda 446216 784926 9550688 4382310 424847 312726 5922052 19310380 0 3376340 23705160
   3       1 hda1 35486 38030 38030 38030
   7       0 loop0 0 0 0 0 0 0 0 0 0 0 0
   8       0 sda 12345 100 987654 5000 6789 50 456789 3000 0 4000 8000 0 0 0 0
   8       1 sda1 10000 800000 5000 400000
   8      16 sdb 0 0 0 0 0 0 0 0 0 0 0
 259       0 nvme0n1 50000 200 2000000 10000 30000 150 1500000 8000 5 15000 18000 0 0 0 0
 259       1 nvme0n1p1 49000 190 1990000 9900 29000 140 1490000 7900 0 14800 17800 0 0 0 0
",
        );

        fs
    }

    /// Creates a system with statistics in `/proc/partitions` (legacy layout)
    /// and 2 CPUs. There is no `/proc/diskstats`.
    pub fn legacy_system() -> Self {
        let fs = Self::new();

        fs.add_file("/proc/cpuinfo", cpuinfo(2));
        fs.add_file(
            "/proc/stat",
            "\
cpu  1000 50 300 8000
cpu0 500 25 150 4000
cpu1 500 25 150 4000
page 5741 1808
swap 1 0
intr 1462898 1400000 2 0 0 0 0 0 0
ctxt 115315
btime 1062491254
processes 3096
",
        );
        fs.add_file(
            "/proc/partitions",
            "\
major minor  #blocks  name     rio rmerge rsect ruse wio wmerge wsect wuse running use aveq

   3     0   19535040 hda 446216 784926 9550688 4382310 424847 312726 5922052 19310380 0 3376340 23705160
   3     1    9766520 hda1 35486 38030 38030 38030 0 0 0 0 0 0 0
   8     0    8388608 sda 1200 30 24000 500 800 20 16000 400 0 700 900
",
        );

        fs
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collector::traits::FileSystem;
    use std::path::Path;

    #[test]
    fn modern_system_has_diskstats_only() {
        let fs = MockFs::modern_system();
        assert!(fs.read_to_string(Path::new("/proc/diskstats")).is_ok());
        assert!(fs.read_to_string(Path::new("/proc/partitions")).is_err());
    }

    #[test]
    fn legacy_system_has_partitions_only() {
        let fs = MockFs::legacy_system();
        assert!(fs.read_to_string(Path::new("/proc/partitions")).is_ok());
        assert!(fs.read_to_string(Path::new("/proc/diskstats")).is_err());
    }

    #[test]
    fn cpuinfo_lists_requested_processors() {
        let content = cpuinfo(3);
        assert_eq!(content.matches("processor\t:").count(), 3);
    }
}
