//! Human-readable meaning of KZ options and input fields

use crate::input::version::IntegratorVersion;

static NBODY6_KZ: [(usize, &str); 47] = [
    (1, "COMMON save unit 1 (=1: 'touch STOP'; =2: every 100*NMAX steps)."),
    (2, "COMMON save unit 2 (=1: at output; =2: restart if DE/E > 5*QE)."),
    (3, "Basic data unit 3 at output time (unformatted, frequency NFIX; =1/2: standard and tail; =3: tail only; >3: cluster + tail)."),
    (4, "Binary diagnostics on unit 4 (# threshold levels = KZ(4) < 10); (suppressed in input.f & ksint.f); new usage: number of NS & BH on unit #4; >1: BH mass histogram."),
    (5, "Initial conditions (#22 =0; =0: uniform & isotropic sphere); =1: Plummer; =2: two Plummer models in orbit, extra input; =3: massive perturber and planetesimal disk, extra input; =4: massive initial binary, extra input: A, E, M1, M2; =5: Jaffe model; >=6: Zhao BH cusp model, extra input if #24 < 0: ZMH, RCUT."),
    (6, "Soft & regularized binaries & individual bodies at main output; =1: soft & regularized binaries on unit 6; =2: regularized binaries only; >2: individual bodies (loop from 1 to KZ(6))."),
    (7, "Lagrangian radii (>0: RSCALE; =2, 3, 4: output units 6, 7); >=2: half-mass radii of 50% mass, also 1% heavies, unit 6; >=2: Lagrangian radii for two mass groups on unit 31 & 32; >=2: geometric radii for three mass groups on unit 6; =5: density, rms velocity & mean mass on unit 26, 27 & 36; =6: pairwise values of mean mass and radii on unit 28."),
    (8, "Primordial binaries (=1 & >=3 routine BINPOP; >=3: SWEEP; =4: Kroupa 1995 period distribution; >4: standard setup using RANGE & SEMI0)."),
    (9, "Binary output (=1, 2, 3 in BINDAT): =1: regularized binaries on OUT9; >1: hierarchical systems on HIDAT (NMERGE > 0); =2: regularized and soft binaries (unit #19); =3: soft binaries only on #19."),
    (10, "Diagnostic KS output (>0: begin KS; >1: end; >=3: each step)."),
    (11, "Algorithmic Chain regularization and post-Newtonian (NBODY7). non-zero: PN for unpert KS or re-init ARChain (ksint.f); > 0: addition of initial BHs (binary/singles; scale.f); = -1: standard case of subsystem for ARChain (ksint.f); < -1: ARChain restricted to BH binary components (ksint.f)."),
    (12, "HR diagnostics of evolving stars (> 0; interval DTPLOT); =2: input of stellar parameters on fort.12 (routine INSTAR)."),
    (13, "Interstellar clouds (=1: constant velocity; >1: Gaussian)."),
    (14, "External force (=1: standard tidal field; =2: point-mass galaxy; =3: point-mass + bulge + disk + halo + Plummer; =4: Plummer)."),
    (15, "Triple, quad, chain (#30 > 0) or merger search (>1: more output)."),
    (16, "Updating of regularization parameters (>0: RMIN, DTMIN & ECLOSE); >1: RMIN expression based on core radius; >2: modify RMIN for GPERT > 0.05 or < 0.002 in chain."),
    (17, "Modification of ETAI, ETAR (>=1) and ETAU (>1) by tolerance QE."),
    (18, "Hierarchical systems (=1: diagnostics; =2: primordial; =3: both)."),
    (19, "Mass loss (=1: old supernova scheme; =3: Eggleton, Tout & Hurley; >3: extra diagnostics)."),
    (20, "Initial mass function (=0: Salpeter type using ALPHAS; =1: Scalo; =2, 4: Kroupa 1993; =3, 5: Eggleton; > 1: primordial binaries; =6, 7: Kroupa 2001; binary correlated m1/m2, also brown dwarfs. Note: Use PARAMETER (MAXM=1) for setting BODY(1) = BODY10). KGT93 (Kroupa, Gilmore & Tout 1993) not recommended."),
    (21, "Extra output (>0: MODEL #, TCOMP, DMIN, AMIN; >1: NESC by JACOBI)."),
    (22, "Initial m, r, v on #10 (=1: output; >=2: input; >2: no scaling; =2: m, r, v on #10 in any units; scaled to standard units; Note: choose #20 = 0 to avoid Salpeter IMF with scaling; =3: no scaling of input read on fort.10; =4: input from mcluster.c (no scaling; binaries if NBIN0 >0); =-1: astrophysical input (M_sun, km/s, pc) on unit #10)."),
    (23, "Escaper removal (>1: diagnostics in file ESC with V_inf in km/s); >=3: initialization & integration of tidal tail."),
    (24, "Initial conditions for subsystem (M,X,V routine SCALE; KZ(24)= #); <0: ZMH & RCUT (N-body units) Zhao model (#5>=6)."),
    (25, "Velocity kicks for white dwarfs (=1: type 11 & 12; >1: all WDs)."),
    (26, "Slow-down of two-body motion (>=1: KS; >=2: chain; =3: rectify)."),
    (27, "Tidal effects (=1: sequential; =2: chaos; =3: GR energy loss); =-1: collision detector, no coalescence, #13 < 0."),
    (28, "GR radiation for NS & BH binaries (with #19 = 3; choice of #27); =4 and #27 = 3: neutron star capture (instar.f)."),
    (29, "Boundary reflection for hot system (suppressed)."),
    (30, "Multiple regularization (=1: all; >1: BEGIN/END; >2: each step); =-1: CHAIN only; =-2: TRIPLE & QUAD only."),
    (31, "Centre of mass correction after ADJUST (don't use with #23 = 0)."),
    (32, "Increase output intervals & SMAX based on single particle energy."),
    (33, "Histograms at main output (>=1: STEP; =2: STEPR, NBHIST & BINARY)."),
    (34, "Roche-lobe overflow (=1: ROCHE & SYNCH; =2: ROCHE & BSE synch)."),
    (35, "Time offset (global time from TTOT = TIME + TOFF; offset = 100)."),
    (36, "Step reduction for hierarchical systems (suppressed)."),
    (37, "Neighbour additions in CHECKL (>0: high-velocity; >1: all types)."),
    (38, "Force polynomial corrections."),
    (39, "No unique density centre."),
    (40, "Neighbour number control."),
    (41, "Pre-mainsequence stellar evolution."),
    (42, "Kozai diagnostics."),
    (43, "Small velocity kick after GR coalescence."),
    (44, "Plotting file for main cluster parameters."),
    (45, "Plotting file for BH."),
    (46, "Reserved for data analysis."),
    (50, "Not used."),
];

/// Options whose meaning differs in Nbody6++GPU; everything else as in Nbody6
static NBODY6PP_KZ: [(usize, &str); 7] = [
    (12, "HR diagnostics of evolving stars (> 0; interval DTPLOT); =2: input of stellar parameters on fort.12; with KZ(46) > 0 the stellar data go into the snapshot files."),
    (19, "Stellar evolution mass loss (=1: old supernova scheme; =3: Eggleton, Tout & Hurley; =4, 5: SSE/BSE with extra diagnostics)."),
    (40, "Neighbour number control (=0: no control; =1: NNBOPT target; =2: adaptive; =3: initial guess from density)."),
    (46, "Output all particle data (=1, 3: HDF5; =2, 4: binary; >2: with stellar evolution)."),
    (47, "Frequency of KZ(46) output in units of DELTAT (0: every output)."),
    (48, "Output of stellar evolution events (=1: sse/bse event files)."),
    (49, "Computation of moment of inertia (=1: every output)."),
];

static NBODY4_KZ: [(usize, &str); 40] = [
    (1, "COMMON save on unit 1 at end of run (=2: every 100*NMAX steps)."),
    (2, "COMMON save on unit 2 at output (=1); restart if DE/E > 5*QE (=2)."),
    (3, "Basic data on unit 3 at output time (frequency NFIX)."),
    (4, "Binary diagnostics on unit 4 (# threshold levels = KZ(4) < 10)."),
    (5, "Initial conditions (=0: uniform & isotropic sphere; =1: Plummer; =2: two Plummer models in orbit)."),
    (6, "Significant binaries at main output (=1; >1: all)."),
    (7, "Lagrangian radii (>0: RSCALE; =2, 3, 4: output units 6, 7)."),
    (8, "Primordial binaries (=1 & >=3; >0: BINOUT; >2: BINDAT)."),
    (9, "Individual bodies printed at output time (MIN(5**KZ9, N))."),
    (10, "Diagnostic KS output (>0: begin KS; >1: end; >=3: each step)."),
    (11, "Synchronization of circular orbits (suppressed)."),
    (12, "HR diagnostics of evolving stars (interval DTPLOT)."),
    (13, "Interstellar clouds (=1: constant velocity; >1: Gaussian)."),
    (14, "External force (=1: linearized tidal field; =2: point-mass galaxy; =3: point-mass + disk)."),
    (15, "Triple, quad, chain (#30 > 0) or merger search (>1: full output)."),
    (16, "Updating of regularization parameters (RMIN, DTMIN & ECLOSE)."),
    (17, "Modification of ETA (>=1) and ETAU (>1) by tolerance QE."),
    (18, "Hierarchical systems (=1: diagnostics; =2: primordial; =3: both)."),
    (19, "Stellar evolution mass loss (=1: supernova scheme; =3: Eggleton, Tout & Hurley)."),
    (20, "Initial mass function (=0: Salpeter type using ALPHA; =1: Scalo; =2: Kroupa)."),
    (21, "Extra output (>0: MODEL #, TCOMP, DMIN, AMIN)."),
    (22, "Initial m, r, v on unit 10 (=1: output; >=2: input; >2: no scaling)."),
    (23, "Escaper removal (>1: diagnostics in file ESC; =2: angles)."),
    (24, "Initial conditions for subsystem (routine SCALE; KZ(24) = #)."),
    (25, "Partial reflection of KS binary orbit (GAMMA < GMIN; suppressed)."),
    (26, "Slow-down of two-body motion (=1: KS binary; =2: chain binary)."),
    (27, "Tidal effects (=1: sequential; =2: chaos; =3: GR energy loss)."),
    (28, "Magnetic braking and gravitational radiation for NS or BH binaries."),
    (29, "Boundary reflection for hot system (suppressed)."),
    (30, "Chain regularization (=1: basic; >1: main output; >2: each step)."),
    (31, "Centre of mass correction after energy check."),
    (32, "Increase of output intervals (based on single particle energy)."),
    (33, "Block-step diagnostics at main output."),
    (34, "Roche-lobe overflow (suppressed)."),
    (35, "GRAPE statistics at main output."),
    (36, "Step reduction for hierarchical systems (suppressed)."),
    (37, "Step reduction for hierarchical systems."),
    (38, "Host force polynomial corrections."),
    (39, "Not used."),
    (40, "Not used."),
];

static PARAMETERS: [(&str, &str); 49] = [
    ("KSTART", "Control index (1: new run; >1: restart; 3, 4, 5: new parameters)."),
    ("TCOMP", "Maximum computing time in minutes."),
    ("TCRTP0", "Termination time in physical units (Myr)."),
    ("isernb", "Maximum neighbour list size for serial irregular force."),
    ("iserreg", "Maximum block size for serial regular force."),
    ("iserks", "Maximum KS block size for serial integration."),
    ("GPID", "GRAPE processor identifier."),
    ("N", "Total particle number (singles + 2 * binaries)."),
    ("NFIX", "Output frequency of data save or binaries."),
    ("NCRIT", "Final particle number (alternative termination criterion)."),
    ("NRAND", "Random number sequence skip."),
    ("NNBMAX", "Maximum number of neighbours."),
    ("NNBOPT", "Optimal neighbour number."),
    ("NRUN", "Run identification index."),
    ("NCOMM", "Frequency of COMMON save."),
    ("ETA", "Time-step parameter for total force polynomial."),
    ("ETAI", "Time-step parameter for irregular force polynomial."),
    ("ETAR", "Time-step parameter for regular force polynomial."),
    ("RS0", "Initial radius of neighbour sphere (N-body units)."),
    ("DTADJ", "Time interval for parameter adjustment (N-body units)."),
    ("DELTAT", "Output time interval (N-body units)."),
    ("TCRIT", "Termination time (N-body units)."),
    ("QE", "Energy tolerance (restart if DE/E > 5*QE and KZ(2) > 1)."),
    ("RBAR", "Virial cluster radius in pc (set = 1 for isolated cluster)."),
    ("ZMBAR", "Mean mass in solar units (=0: 1.0 or if KZ(20) > 0: from IMF)."),
    ("DTMIN", "Time-step criterion for regularization search."),
    ("RMIN", "Distance criterion for regularization search."),
    ("ETAU", "Regularized time-step parameter (6.28/ETAU steps/orbit)."),
    ("ECLOSE", "Binding energy per unit mass for hard binary (positive)."),
    ("GMIN", "Relative two-body perturbation for unperturbed motion."),
    ("GMAX", "Secondary termination parameter for soft KS binaries."),
    ("SMAX", "Maximum time-step (factor of 2 commensurate with 1.0)."),
    ("ALPHA", "Power-law index for initial mass function (used if KZ(20) < 2)."),
    ("BODY1", "Maximum particle mass before scaling (KZ(20): solar mass)."),
    ("BODYN", "Minimum particle mass before scaling."),
    ("NBIN0", "Number of primordial binaries (for IMF2 with KZ(20) > 1)."),
    ("NHI0", "Primordial hierarchies (may be needed in IMF if > 0)."),
    ("ZMET", "Metal abundance (in range 0.03 - 0.0001)."),
    ("EPOCH0", "Evolutionary epoch (in 10**6 yrs; NB! < 0 for PM evolution)."),
    ("DTPLOT", "Plotting interval for HRDIAG (N-body units; >= DELTAT)."),
    ("Q", "Virial ratio (Q = 0.5 for equilibrium)."),
    ("VXROT", "XY-velocity scaling factor (> 0 for solid-body rotation)."),
    ("VZROT", "Z-velocity scaling factor (not used if VXROT = 0)."),
    ("RTIDE", "Unscaled tidal radius (#14 >= 2; otherwise copied to RSPH2)."),
    ("GMG", "Point-mass galaxy (solar masses)."),
    ("RG0", "Distance from the galaxy centre (kpc)."),
    ("DISK", "Mass of Miyamoto disk (solar masses)."),
    ("A", "Softening length in Miyamoto potential (in kpc)."),
    ("B", "Vertical softening length (kpc)."),
];

pub const UNKNOWN_KZ: &str = "Unknown KZ option";
pub const NO_DESCRIPTION: &str = "No description available.";

fn lookup(table: &[(usize, &'static str)], index: usize) -> Option<&'static str> {
    table.iter().find(|(k, _)| *k == index).map(|(_, d)| *d)
}

/// Meaning of the 1-based KZ option `index` for `version`
pub fn kz_description(version: IntegratorVersion, index: usize) -> Option<&'static str> {
    match version {
        IntegratorVersion::Nbody4 => lookup(&NBODY4_KZ, index),
        IntegratorVersion::Nbody6 => lookup(&NBODY6_KZ, index),
        IntegratorVersion::Nbody6ppGpu | IntegratorVersion::Nbody6ppGpuBeijing => {
            lookup(&NBODY6PP_KZ, index).or_else(|| lookup(&NBODY6_KZ, index))
        }
    }
}

pub fn parameter_description(name: &str) -> Option<&'static str> {
    PARAMETERS.iter().find(|(n, _)| *n == name).map(|(_, d)| *d)
}
