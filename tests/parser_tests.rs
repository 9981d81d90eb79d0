use hprofviz::parser::{parse_text_dump, CallSite};
use hprofviz::utils::error::ParseError;
use pretty_assertions::assert_eq;

const CPU_SAMPLES_DUMP: &str = "\
JAVA PROFILE 1.0.1, created Wed Apr  1 10:00:00 2015

Header for -agentlib:hprof (or -Xrunhprof) ASCII Output (JDK 5.0 JVMTI based)

--------

THREAD START (obj=50000150, id = 200001, name=\"main\", group=\"main\")
TRACE 300001:
\tjava.lang.Object.<init>(Object.java:37)
\tcom.example.Main.main(Main.java:10)
TRACE 300002: (thread=200001)
\tcom.example.Main.compute(Main.java:22)
\tcom.example.Main.main(Main.java:11)
TRACE 300003:
\t<empty>
TRACE 300004:
\tsun.misc.Unsafe.park(Unsafe.java:Native method)
CPU SAMPLES BEGIN (total = 9) Wed Apr  1 10:00:05 2015
rank   self  accum   count trace method
   1 66.67% 66.67%       6 300002 com.example.Main.compute
   2 33.33% 100.00%       3 300001 java.lang.Object.<init>
CPU SAMPLES END
";

fn names(set: &hprofviz::parser::TraceSet, id: u32) -> Vec<String> {
    set.resolve(&set.traces[&id]).map(|site| site.name.clone()).collect()
}

#[test]
fn test_parse_cpu_samples_dump() {
    let set = parse_text_dump(CPU_SAMPLES_DUMP.as_bytes()).unwrap();

    assert_eq!(set.len(), 4);
    assert_eq!(set.total_count(), 9);
    assert_eq!(set.declared_total, Some(9));
    assert_eq!(set.traces[&300002].count, 6);
    assert_eq!(set.traces[&300001].count, 3);
    assert_eq!(
        names(&set, 300002),
        vec!["com.example.Main.compute", "com.example.Main.main"]
    );
}

#[test]
fn test_traces_without_samples_keep_zero_count() {
    let set = parse_text_dump(CPU_SAMPLES_DUMP.as_bytes()).unwrap();

    assert_eq!(set.traces[&300003].count, 0);
    assert!(set.traces[&300003].stack.is_empty());
    assert_eq!(set.traces[&300004].count, 0);
    assert_eq!(
        set.leaf_site(&set.traces[&300004]),
        Some(&CallSite::new("sun.misc.Unsafe.park", "Unsafe.java", -3))
    );
}

#[test]
fn test_call_sites_are_shared_across_traces() {
    let input = "TRACE 1:\n\tfoo(Foo.java:10)\n\tmain(Main.java:3)\nTRACE 2:\n\tbar(Bar.java:5)\n\tmain(Main.java:3)\n";
    let set = parse_text_dump(input.as_bytes()).unwrap();

    assert_eq!(set.call_sites.len(), 3);
    assert_eq!(set.traces[&1].stack[1], set.traces[&2].stack[1]);
}

#[test]
fn test_sample_for_unknown_trace() {
    let input = "TRACE 1:\n\tfoo(Foo.java:1)\nCPU SAMPLES BEGIN (total = 1)\nrank self accum count trace method\n    1 100% 100% 1 999 foo\nCPU SAMPLES END\n";
    let err = parse_text_dump(input.as_bytes()).unwrap_err();
    assert!(matches!(err, ParseError::UnknownTrace { line: 5, id: 999 }));
}

#[test]
fn test_duplicate_trace_id() {
    let input = "TRACE 1:\n\tfoo(Foo.java:1)\nTRACE 1:\n\tfoo(Foo.java:1)\n";
    let err = parse_text_dump(input.as_bytes()).unwrap_err();
    assert!(matches!(err, ParseError::DuplicateTrace { line: 3, id: 1 }));
}

#[test]
fn test_malformed_frame_reports_line() {
    let input = "TRACE 1:\n\tfoo(Foo.java:1)\n\tgarbage\n";
    let err = parse_text_dump(input.as_bytes()).unwrap_err();
    assert!(matches!(err, ParseError::MalformedFrame { line: 3, .. }));
    assert!(err.to_string().starts_with("Line 3:"));
}

#[test]
fn test_trace_id_overflow() {
    let input = "TRACE 99999999999:\n\tfoo(Foo.java:1)\n";
    let err = parse_text_dump(input.as_bytes()).unwrap_err();
    assert!(matches!(err, ParseError::MalformedTraceHeader { line: 1 }));
}

#[test]
fn test_short_sample_row() {
    let input = "TRACE 1:\n\tfoo(Foo.java:1)\nCPU SAMPLES BEGIN (total = 1)\n    1 100% 100% 1\n";
    let err = parse_text_dump(input.as_bytes()).unwrap_err();
    assert!(matches!(err, ParseError::MalformedSample { line: 4, .. }));
}

#[test]
fn test_declared_total_mismatch_is_not_fatal() {
    let input = "TRACE 1:\n\tfoo(Foo.java:1)\nCPU SAMPLES BEGIN (total = 10)\n    1 100% 100% 4 1 foo\nCPU SAMPLES END\n";
    let set = parse_text_dump(input.as_bytes()).unwrap();
    assert_eq!(set.total_count(), 4);
    assert_eq!(set.declared_total, Some(10));
}
