//! Dataset codes of the Nbody6++GPU HDF5 snapshot output
//!
//! Every per-step group holds one dataset per quantity, named
//! `"{code:03} {name}"` (e.g. `"023 M"`). The scalar block `"000 Scalars"`
//! is a flat array indexed by the 1-based codes of [`SCALAR_FIELDS`].

use std::collections::HashSet;
use std::sync::OnceLock;

use crate::error::{Error, Result};

/// `(code, name)` of one dataset or scalar slot
pub type FieldCode = (u16, &'static str);

pub const SCALAR_DATASET: &str = "000 Scalars";

/// Number of scalars every snapshot step carries
pub const SCALAR_COUNT: usize = 70;

pub static SCALAR_FIELDS: [FieldCode; SCALAR_COUNT] = [
    (1, "TTOT"),
    (2, "NPAIRS"),
    (3, "RBAR"),
    (4, "ZMBAR"),
    (5, "N"),
    (6, "TSTAR"),
    (7, "RDENS1"),
    (8, "RDENS2"),
    (9, "RDENS3"),
    (10, "TTOT_TCR0"),
    (11, "TSCALE"),
    (12, "VSTAR"),
    (13, "RC"),
    (14, "NC"),
    (15, "VC"),
    (16, "RHOM"),
    (17, "CMAX"),
    (18, "RSCALE"),
    (19, "RSMIN"),
    (20, "DMIN1"),
    (21, "RG1"),
    (22, "RG2"),
    (23, "RG3"),
    (24, "VG1"),
    (25, "VG2"),
    (26, "VG3"),
    (27, "TIDAL1"),
    (28, "TIDAL2"),
    (29, "TIDAL3"),
    (30, "TIDAL4"),
    (31, "GMG"),
    (32, "OMEGA"),
    (33, "DISK"),
    (34, "A_OORT"),
    (35, "B_OORT"),
    (36, "ZMET_HURLEY"),
    (37, "ZPAR1"),
    (38, "ZPAR2"),
    (39, "ZPAR3"),
    (40, "ZPAR4"),
    (41, "ZPAR5"),
    (42, "ZPAR6"),
    (43, "ZPAR7"),
    (44, "ZPAR8"),
    (45, "ZPAR9"),
    (46, "ZPAR10"),
    (47, "ZPAR11"),
    (48, "ZPAR12"),
    (49, "ZPAR13"),
    (50, "ZPAR14"),
    (51, "ZPAR15"),
    (52, "ZPAR16"),
    (53, "ZPAR17"),
    (54, "ZPAR18"),
    (55, "ZPAR19"),
    (56, "ZPAR20"),
    (57, "ETAI"),
    (58, "ETAR"),
    (59, "ETAU"),
    (60, "ECLOSE"),
    (61, "DTMIN"),
    (62, "RMIN"),
    (63, "GMIN"),
    (64, "GMAX"),
    (65, "SMAX"),
    (66, "NNBOPT"),
    (67, "EPOCH0"),
    (68, "N_SINGLE"),
    (69, "N_BINARY"),
    (70, "N_MERGER"),
];

/// Single stars, always present
pub static SINGLE_FIELDS: [FieldCode; 10] = [
    (1, "X1"),
    (2, "X2"),
    (3, "X3"),
    (4, "V1"),
    (5, "V2"),
    (6, "V3"),
    (23, "M"),
    (32, "Name"),
    (33, "Type"),
    (35, "ASPN"),
];

/// Stellar evolution of single stars, written only with KZ(12) enabled
pub static SINGLE_HR_FIELDS: [FieldCode; 6] = [
    (26, "R*"),
    (27, "L*"),
    (28, "Teff*"),
    (29, "RC*"),
    (30, "MC*"),
    (31, "KW"),
];

pub static BINARY_FIELDS: [FieldCode; 22] = [
    (101, "Bin cm X1"),
    (102, "Bin cm X2"),
    (103, "Bin cm X3"),
    (104, "Bin cm V1"),
    (105, "Bin cm V2"),
    (106, "Bin cm V3"),
    (107, "Bin rel X1"),
    (108, "Bin rel X2"),
    (109, "Bin rel X3"),
    (110, "Bin rel V1"),
    (111, "Bin rel V2"),
    (112, "Bin rel V3"),
    (113, "Bin M1*"),
    (114, "Bin M2*"),
    (115, "Bin Name1"),
    (116, "Bin Name2"),
    (117, "Bin Name cm"),
    (118, "Bin Type1"),
    (119, "Bin Type2"),
    (120, "Bin ECC"),
    (121, "Bin P"),
    (122, "Bin A"),
];

pub static BINARY_HR_FIELDS: [FieldCode; 8] = [
    (123, "Bin R1*"),
    (124, "Bin R2*"),
    (125, "Bin L1*"),
    (126, "Bin L2*"),
    (127, "Bin Teff1*"),
    (128, "Bin Teff2*"),
    (129, "Bin KW1"),
    (130, "Bin KW2"),
];

pub static MERGER_FIELDS: [FieldCode; 13] = [
    (201, "Mer XC1"),
    (202, "Mer XC2"),
    (203, "Mer XC3"),
    (204, "Mer VC1"),
    (205, "Mer VC2"),
    (206, "Mer VC3"),
    (207, "Mer M1"),
    (208, "Mer M2"),
    (209, "Mer M3"),
    (210, "Mer Name cm"),
    (211, "Mer Name1"),
    (212, "Mer Name2"),
    (213, "Mer Name3"),
];

/// Dataset name inside a step group
pub fn dataset_name(field: &FieldCode) -> String {
    format!("{:03} {}", field.0, field.1)
}

/// All code tables, checked for consistency once per process
#[derive(Debug)]
pub struct Schema {
    pub scalars: &'static [FieldCode],
    pub singles: &'static [FieldCode],
    pub singles_hr: &'static [FieldCode],
    pub binaries: &'static [FieldCode],
    pub binaries_hr: &'static [FieldCode],
    pub mergers: &'static [FieldCode],
}

static SCHEMA: Schema = Schema {
    scalars: &SCALAR_FIELDS,
    singles: &SINGLE_FIELDS,
    singles_hr: &SINGLE_HR_FIELDS,
    binaries: &BINARY_FIELDS,
    binaries_hr: &BINARY_HR_FIELDS,
    mergers: &MERGER_FIELDS,
};

static CHECKED: OnceLock<std::result::Result<(), String>> = OnceLock::new();

impl Schema {
    /// The tables, after verifying them on first use
    pub fn validated() -> Result<&'static Schema> {
        CHECKED
            .get_or_init(|| SCHEMA.check())
            .clone()
            .map_err(Error::Validation)?;
        Ok(&SCHEMA)
    }

    /// 1-based slot of a scalar by name
    pub fn scalar_code(&self, name: &str) -> Option<u16> {
        self.scalars.iter().find(|f| f.1 == name).map(|f| f.0)
    }

    fn check(&self) -> std::result::Result<(), String> {
        // Scalars must cover 1..=SCALAR_COUNT in order
        for (k, field) in self.scalars.iter().enumerate() {
            if field.0 as usize != k + 1 {
                return Err(format!(
                    "scalar '{}' has code {}, expected {}",
                    field.1,
                    field.0,
                    k + 1
                ));
            }
        }
        let mut names = HashSet::new();
        for field in self.scalars {
            if !names.insert(field.1) {
                return Err(format!("duplicate scalar name '{}'", field.1));
            }
        }

        // Particle datasets share one namespace inside a step group
        let particle_tables = [
            self.singles,
            self.singles_hr,
            self.binaries,
            self.binaries_hr,
            self.mergers,
        ];
        let mut codes = HashSet::new();
        let mut names = HashSet::new();
        for field in particle_tables.iter().flat_map(|t| t.iter()) {
            if field.0 == 0 {
                return Err(format!("dataset '{}' uses the scalar code 000", field.1));
            }
            if !codes.insert(field.0) {
                return Err(format!("duplicate dataset code {:03}", field.0));
            }
            if !names.insert(field.1) {
                return Err(format!("duplicate dataset name '{}'", field.1));
            }
        }
        Ok(())
    }
}
