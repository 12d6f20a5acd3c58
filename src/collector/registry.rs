//! Registry of monitored block devices.
//!
//! Built once from the discovery records of the active counter layout and
//! never changed afterwards.

use std::collections::HashSet;

use serde::Serialize;
use tracing::debug;

use crate::collector::abi::DiscoveryRecord;
use crate::collector::error::ConfigError;
use crate::storage::model::DeviceId;

/// IDE disk majors (`IDE0_MAJOR` .. `IDE9_MAJOR`).
const IDE_MAJORS: [u32; 10] = [3, 22, 33, 34, 56, 57, 88, 89, 90, 91];

/// Partition bits of an IDE minor number.
const IDE_PARTITION_MASK: u32 = 0x3F;

/// Partition bits of a SCSI disk minor number.
const SCSI_PARTITION_MASK: u32 = 0x0F;

fn is_ide_disk(major: u32) -> bool {
    IDE_MAJORS.contains(&major)
}

fn is_scsi_disk(major: u32) -> bool {
    major == 8 || (65..=71).contains(&major) || (128..=135).contains(&major)
}

/// A monitored device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeviceIdentity {
    #[serde(flatten)]
    pub id: DeviceId,
    pub name: String,
}

/// Whole-device / partition visibility policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Visibility {
    pub show_whole_device: bool,
    pub show_partitions: bool,
}

impl Default for Visibility {
    fn default() -> Self {
        Self {
            show_whole_device: true,
            show_partitions: false,
        }
    }
}

impl Visibility {
    /// Decides whether a device is shown.
    ///
    /// IDE and SCSI disks encode the partition number in the low minor
    /// bits; minor bits of zero mean the whole disk. Devices of any other
    /// class are always shown.
    pub fn printable(&self, id: DeviceId) -> bool {
        let mask = if is_ide_disk(id.major) {
            IDE_PARTITION_MASK
        } else if is_scsi_disk(id.major) {
            SCSI_PARTITION_MASK
        } else {
            return true;
        };

        if id.minor & mask == 0 {
            self.show_whole_device
        } else {
            self.show_partitions
        }
    }
}

/// Ordered, capacity-limited set of monitored devices.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceRegistry {
    devices: Vec<DeviceIdentity>,
}

impl DeviceRegistry {
    /// Builds the registry from discovery records.
    ///
    /// With a non-empty `name_filter` every record whose name is listed is
    /// registered, ordered by position in the filter. Otherwise a record is
    /// registered when it has seen reads and `visibility` accepts it, in
    /// discovery order. Duplicate device numbers keep the first record.
    /// Entries beyond `capacity` are dropped silently.
    pub fn discover<I>(
        records: I,
        name_filter: &[String],
        visibility: Visibility,
        capacity: usize,
    ) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = DiscoveryRecord>,
    {
        if capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }

        let mut seen = HashSet::new();
        let mut candidates: Vec<(usize, DeviceIdentity)> = Vec::new();

        for rec in records {
            if seen.contains(&rec.id) {
                continue;
            }

            let rank = if name_filter.is_empty() {
                if rec.reads == 0 || !visibility.printable(rec.id) {
                    continue;
                }
                0
            } else {
                match name_filter.iter().position(|n| *n == rec.name) {
                    Some(pos) => pos,
                    None => continue,
                }
            };

            seen.insert(rec.id);
            candidates.push((
                rank,
                DeviceIdentity {
                    id: rec.id,
                    name: rec.name,
                },
            ));
        }

        // Stable: ties keep discovery order.
        candidates.sort_by_key(|(rank, _)| *rank);

        if candidates.len() > capacity {
            debug!(
                "registry full: keeping {} of {} devices",
                capacity,
                candidates.len()
            );
            candidates.truncate(capacity);
        }

        let devices: Vec<DeviceIdentity> = candidates.into_iter().map(|(_, d)| d).collect();
        for d in &devices {
            debug!("registered {} ({})", d.name, d.id);
        }

        Ok(Self { devices })
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Devices in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &DeviceIdentity> {
        self.devices.iter()
    }

    pub fn contains(&self, id: DeviceId) -> bool {
        self.devices.iter().any(|d| d.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(major: u32, minor: u32, name: &str, reads: u64) -> DiscoveryRecord {
        DiscoveryRecord {
            id: DeviceId::new(major, minor),
            name: name.to_string(),
            reads,
        }
    }

    fn names(reg: &DeviceRegistry) -> Vec<&str> {
        reg.iter().map(|d| d.name.as_str()).collect()
    }

    #[test]
    fn printable_ide_and_scsi_masks() {
        let disks_only = Visibility::default();
        assert!(disks_only.printable(DeviceId::new(3, 0)));
        assert!(disks_only.printable(DeviceId::new(3, 64))); // hdb
        assert!(!disks_only.printable(DeviceId::new(3, 1)));
        assert!(disks_only.printable(DeviceId::new(8, 16))); // sdb
        assert!(!disks_only.printable(DeviceId::new(8, 17)));
        assert!(!disks_only.printable(DeviceId::new(65, 3)));
        assert!(disks_only.printable(DeviceId::new(135, 0)));

        let parts_only = Visibility {
            show_whole_device: false,
            show_partitions: true,
        };
        assert!(!parts_only.printable(DeviceId::new(3, 0)));
        assert!(parts_only.printable(DeviceId::new(3, 1)));
        assert!(parts_only.printable(DeviceId::new(8, 17)));
        assert!(!parts_only.printable(DeviceId::new(8, 16)));
    }

    #[test]
    fn printable_unknown_classes_always_shown() {
        let hidden = Visibility {
            show_whole_device: false,
            show_partitions: false,
        };
        assert!(hidden.printable(DeviceId::new(259, 0)));
        assert!(hidden.printable(DeviceId::new(253, 3)));
        assert!(!hidden.printable(DeviceId::new(8, 0)));
    }

    #[test]
    fn scsi_mask_is_narrower_than_ide() {
        // minor 16 is a whole SCSI disk but a partition of an IDE disk
        let disks_only = Visibility::default();
        assert!(disks_only.printable(DeviceId::new(8, 16)));
        assert!(!disks_only.printable(DeviceId::new(3, 16)));
    }

    #[test]
    fn discover_skips_unused_and_hidden() {
        let records = vec![
            rec(8, 0, "sda", 100),
            rec(8, 1, "sda1", 50),
            rec(8, 16, "sdb", 0),
            rec(259, 0, "nvme0n1", 7),
        ];
        let reg = DeviceRegistry::discover(records, &[], Visibility::default(), 64).unwrap();
        assert_eq!(names(&reg), vec!["sda", "nvme0n1"]);
        assert!(reg.contains(DeviceId::new(259, 0)));
        assert!(!reg.contains(DeviceId::new(8, 1)));
    }

    #[test]
    fn discover_dedupes_by_device_number() {
        let records = vec![rec(8, 0, "sda", 1), rec(8, 0, "sda-again", 1)];
        let reg = DeviceRegistry::discover(records, &[], Visibility::default(), 64).unwrap();
        assert_eq!(names(&reg), vec!["sda"]);
    }

    #[test]
    fn discover_with_filter_ignores_reads_and_visibility() {
        let records = vec![
            rec(8, 0, "sda", 100),
            rec(8, 1, "sda1", 0),
            rec(8, 16, "sdb", 0),
        ];
        let filter = vec!["sdb".to_string(), "sda1".to_string()];
        let reg = DeviceRegistry::discover(records, &filter, Visibility::default(), 64).unwrap();
        assert_eq!(names(&reg), vec!["sdb", "sda1"]);
    }

    #[test]
    fn discover_with_filter_skips_unknown_names() {
        let records = vec![rec(8, 0, "sda", 1)];
        let filter = vec!["md0".to_string()];
        let reg = DeviceRegistry::discover(records, &filter, Visibility::default(), 64).unwrap();
        assert!(reg.is_empty());
    }

    #[test]
    fn discover_truncates_at_capacity() {
        let records = vec![rec(8, 0, "sda", 1), rec(8, 16, "sdb", 1), rec(8, 32, "sdc", 1)];
        let reg = DeviceRegistry::discover(records, &[], Visibility::default(), 2).unwrap();
        assert_eq!(names(&reg), vec!["sda", "sdb"]);
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn discover_rejects_zero_capacity() {
        let err = DeviceRegistry::discover(Vec::new(), &[], Visibility::default(), 0).unwrap_err();
        assert!(matches!(err, ConfigError::ZeroCapacity));
    }
}
