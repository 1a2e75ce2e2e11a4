use starcluster::input::kz::{format_kz_lines, parse_kz_list, parse_kz_tokens};
use starcluster::input::layout::{prepare_lines, read_input_file};
use starcluster::input::namelist::{cast_value, parse_namelist};
use starcluster::{Error, InputSummary, IntegratorVersion, ParamValue};

const NBODY6_INPUT: &str = "\
1 100000.0
1000 1 10 43532 100 0
0.02 0.02 0.3 1.0 10.0 1000.0 2.0E-05 1.0 0.7

1 2 1 0 1 0 4 0 0 2
0 1 0 0 0 2 1 0 0 2
0 0 0 0 0 0 0 0 0 0
0 0 0 0 0 0 0 0 0 0
0 0 0 0 0 0 0 0 0 0
1.0D-04 0.01 0.1 1.0 1.0 100.0
2.35 10.0 0.2 0 0 0.001 0 100.0
0.5 0.0 0.0 0.0 0.0
";

const NBODY6PP_INPUT: &str = "\
1 100000.0 1.E6 40 40 640
1000 1 10 4353 100 1 10
0.02 0.02 0.19 1.0 1.0 100.0 2.0E-05 1.0 0.7
1 2 1 0 1 0 4 0 0 2
0 1 0 0 0 2 1 0 0 2
0 0 0 0 0 0 0 0 0 0
0 0 0 0 0 0 0 0 0 0
0 0 0 0 0 0 0 0 0 0
1.0E-05 1.0E-04 0.2 1.0 1.0E-06 0.01 0.125
2.35 20.0 0.08 0 0 0.001 0 1.0
0.5 0.0 0.0 0.0
";

const BEIJING_NAMELIST: &str = "\
&INNBODY6 KSTART=1 TCOMP=100000.0 TCRTP0=1.D6 isernb=40 iserreg=40 iserks=640 /
&ININPUT N=1000 NFIX=1 NCRIT=10 NRAND=4353 NNBOPT=100 NRUN=1 NCOMM=10
ETAI=0.02 ETAR=0.02 RS0=0.19 DTADJ=1.0 DELTAT=1.0 TCRIT=100.0 QE=2.0E-5
KZ(1:10)=1 2 1 0 1 0 4 0 0 2
KZ(11:20)=0 1 0 0 0 2 1 0 0 2
/
";

pub fn parse(
    text: &str,
    version: IntegratorVersion,
) -> starcluster::Result<starcluster::InputRecord> {
    (version.parser())(&prepare_lines(text))
}

// ==================================================================================
// Positional layouts
// ==================================================================================

#[test]
fn nbody6_positional_fields() {
    let record = parse(NBODY6_INPUT, IntegratorVersion::Nbody6).unwrap();

    assert_eq!(record.version, IntegratorVersion::Nbody6);
    assert_eq!(record.get("N"), Some(&ParamValue::Int(1000)));
    assert_eq!(record.get("NRAND").and_then(ParamValue::as_i64), Some(43532));
    assert_eq!(record.get("DTMIN"), Some(&ParamValue::Float(1.0e-4)));
    assert_eq!(record.get("SMAX").and_then(ParamValue::as_f64), Some(0.0));

    assert_eq!(record.kz.len(), 50);
    assert_eq!(record.kz(1), Some(1));
    assert_eq!(record.kz(7), Some(4));
    assert_eq!(record.kz(16), Some(2));
    assert_eq!(record.kz(51), None);
    assert_eq!(record.kz(0), None);

    // File order is kept
    assert_eq!(record.fields[0].0, "KSTART");
    assert_eq!(record.fields.last().map(|f| f.0.as_str()), Some("SMAX"));
}

#[test]
fn nbody6pp_positional_fields() {
    let record = parse(NBODY6PP_INPUT, IntegratorVersion::Nbody6ppGpu).unwrap();

    assert_eq!(record.get("iserks"), Some(&ParamValue::Float(640.0)));
    assert_eq!(record.get("NCOMM"), Some(&ParamValue::Int(10)));
    assert_eq!(record.get("SMAX"), Some(&ParamValue::Float(0.125)));
    assert_eq!(record.get("RTIDE"), Some(&ParamValue::Float(0.0)));
}

#[test]
fn wrong_value_count_names_the_line() {
    let broken = NBODY6_INPUT.replacen("1000 1 10 43532 100 0", "1000 1 10 43532 100", 1);
    match parse(&broken, IntegratorVersion::Nbody6) {
        Err(Error::Validation(msg)) => assert!(msg.contains("line 2"), "{msg}"),
        other => panic!("unexpected result {other:?}"),
    }
}

#[test]
fn integer_field_rejects_float() {
    let broken = NBODY6_INPUT.replacen("1000 1 10", "1000.5 1 10", 1);
    assert!(matches!(parse(&broken, IntegratorVersion::Nbody6), Err(Error::Validation(_))));
}

#[test]
fn short_kz_block_is_rejected() {
    let broken = NBODY6_INPUT.replacen("1 2 1 0 1 0 4 0 0 2", "1 2 1 0 1 0 4 0 0", 1);
    match parse(&broken, IntegratorVersion::Nbody6) {
        Err(Error::Validation(msg)) => assert!(msg.contains("KZ length"), "{msg}"),
        other => panic!("unexpected result {other:?}"),
    }
}

#[test]
fn truncated_file_is_rejected() {
    let lines: Vec<&str> = NBODY6_INPUT.lines().take(6).collect();
    assert!(matches!(
        parse(&lines.join("\n"), IntegratorVersion::Nbody6),
        Err(Error::Validation(_))
    ));
}

#[test]
fn input_file_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nbody6.inp");
    std::fs::write(&path, NBODY6_INPUT).unwrap();

    let record = read_input_file(&path, IntegratorVersion::Nbody6).unwrap();
    assert_eq!(record.get("ZMBAR"), Some(&ParamValue::Float(0.7)));

    let missing = read_input_file(&dir.path().join("none.inp"), IntegratorVersion::Nbody6);
    assert!(matches!(missing, Err(Error::MissingInput(_))));
}

#[test]
fn fortran_exponents_only_in_numbers() {
    let lines = prepare_lines("  DTADJ=1.0  1.5D-03 2d2\n\n  end  ");
    assert_eq!(lines, vec!["DTADJ=1.0 1.5E-03 2E2".to_string(), "end".to_string()]);
}

// ==================================================================================
// Namelist (beijing)
// ==================================================================================

#[test]
fn beijing_falls_back_to_namelist() {
    let record = parse(BEIJING_NAMELIST, IntegratorVersion::Nbody6ppGpuBeijing).unwrap();

    assert_eq!(record.version, IntegratorVersion::Nbody6ppGpuBeijing);
    assert_eq!(record.get("KSTART"), Some(&ParamValue::Int(1)));
    assert_eq!(record.get("TCRTP0"), Some(&ParamValue::Float(1.0e6)));
    assert_eq!(record.get("QE"), Some(&ParamValue::Float(2.0e-5)));
    assert_eq!(record.get("iserks"), Some(&ParamValue::Int(640)));

    assert_eq!(record.kz.len(), 50);
    assert_eq!(record.kz(7), Some(4));
    assert_eq!(record.kz(17), Some(1));
    assert_eq!(record.kz(21), Some(0));
}

#[test]
fn beijing_accepts_positional_input() {
    let record = parse(NBODY6PP_INPUT, IntegratorVersion::Nbody6ppGpuBeijing).unwrap();
    assert_eq!(record.version, IntegratorVersion::Nbody6ppGpuBeijing);
    assert_eq!(record.get("N"), Some(&ParamValue::Int(1000)));
}

#[test]
fn beijing_keeps_positional_kz_error() {
    let broken = NBODY6PP_INPUT.replacen("1 2 1 0 1 0 4 0 0 2", "1 2 1 0 1 0 4 0 0", 1);
    match parse(&broken, IntegratorVersion::Nbody6ppGpuBeijing) {
        Err(Error::Validation(msg)) => {
            assert!(msg.contains("KZ length"), "{msg}");
            assert!(msg.contains("namelist"), "{msg}");
        }
        other => panic!("unexpected result {other:?}"),
    }
}

#[test]
fn namelist_without_assignments_is_rejected() {
    let result = parse_namelist("1 2 3\n4 5 6\n", IntegratorVersion::Nbody6ppGpuBeijing);
    assert!(matches!(result, Err(Error::Validation(_))));
}

#[test]
fn every_version_has_its_own_parser() {
    let record = parse(NBODY6PP_INPUT, IntegratorVersion::Nbody6ppGpu).unwrap();
    assert_eq!(record.version, IntegratorVersion::Nbody6ppGpu);
    assert!(parse(NBODY6PP_INPUT, IntegratorVersion::Nbody6).is_err());
    assert!(parse(NBODY6_INPUT, IntegratorVersion::Nbody4).is_err());
}

#[test]
fn kz_range_must_match_value_count() {
    let text = "&ININPUT N=10\nKZ(1:10)=1 2 3\n/\n";
    match parse_namelist(text, IntegratorVersion::Nbody6ppGpuBeijing) {
        Err(Error::Validation(msg)) => assert!(msg.contains("1:10"), "{msg}"),
        other => panic!("unexpected result {other:?}"),
    }

    let outside = "KZ(45:55)=0 0 0 0 0 0 0 0 0 0 0\n";
    assert!(matches!(
        parse_namelist(outside, IntegratorVersion::Nbody6ppGpuBeijing),
        Err(Error::Validation(_))
    ));
}

#[test]
fn namelist_literals() {
    assert_eq!(cast_value("42"), ParamValue::Int(42));
    assert_eq!(cast_value("1.5D-3,"), ParamValue::Float(1.5e-3));
    assert_eq!(cast_value("'plummer'"), ParamValue::Text("plummer".into()));
    assert_eq!(cast_value(".TRUE."), ParamValue::Text(".TRUE.".into()));
}

// ==================================================================================
// KZ lists and summary
// ==================================================================================

#[test]
fn kz_lines_of_ten() {
    let mut kz = vec![0; 40];
    kz[0] = 1;
    kz[39] = 3;
    let lines = format_kz_lines(&kz);

    assert_eq!(lines.len(), 4);
    assert_eq!(lines[0], "1 0 0 0 0 0 0 0 0 0");
    assert_eq!(lines[3], "0 0 0 0 0 0 0 0 0 3");

    let text = lines.join(" ");
    assert_eq!(parse_kz_tokens(text.split_whitespace(), IntegratorVersion::Nbody4).unwrap(), kz);
    assert!(parse_kz_tokens(text.split_whitespace(), IntegratorVersion::Nbody6).is_err());
}

#[test]
fn kz_list_from_command_line() {
    let list = vec!["0"; 50].join(",");
    assert_eq!(parse_kz_list(&list, IntegratorVersion::Nbody6ppGpu).unwrap(), vec![0; 50]);

    match parse_kz_list("1,2,3", IntegratorVersion::Nbody6ppGpu) {
        Err(Error::Validation(msg)) => assert!(msg.contains("len=3"), "{msg}"),
        other => panic!("unexpected result {other:?}"),
    }
    assert!(parse_kz_list(&list.replacen('0', "x", 1), IntegratorVersion::Nbody6ppGpu).is_err());
}

#[test]
fn summary_lists_nonzero_options() {
    let record = parse(NBODY6_INPUT, IntegratorVersion::Nbody6).unwrap();
    let summary = InputSummary::new(&record);

    let indices: Vec<usize> = summary.kz.iter().map(|e| e.index).collect();
    assert_eq!(indices, vec![1, 2, 3, 5, 7, 10, 12, 16, 17, 20]);
    assert_eq!(summary.fields.len(), record.fields.len());

    let text = summary.render();
    assert!(text.contains("nbody6"));
    assert!(text.contains("Non-zero KZ parameters"));
    assert!(text.contains("Other parameters"));

    let empty = InputSummary::from_kz(&[0; 40], IntegratorVersion::Nbody4);
    assert!(empty.kz.is_empty());
    assert!(empty.render().contains("none"));
}
