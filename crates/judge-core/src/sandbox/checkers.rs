//! Native implementations of the built-in testlib-style comparators.
//!
//! Grounded on the teacher's `modules.rs` style: a handful of small, pure,
//! exhaustively-tested functions rather than one large dispatcher. Real
//! testlib checkers are compiled C++ programs linked against a vendored
//! `testlib.h`; this crate doesn't vendor that header (see DESIGN.md), so
//! the built-in names are reimplemented natively in Rust against the same
//! comparison semantics testlib documents for each of them. Custom checkers
//! (the `Checker::Custom` case) are still real subprocesses — see
//! `sandbox::process`.

use crate::model::BUILTIN_CHECKER_NAMES;
use crate::sandbox::CheckerOutcome;

fn tokens(s: &str) -> Vec<&str> {
    s.split_whitespace().collect()
}

fn wrong(message: impl Into<String>) -> CheckerOutcome {
    CheckerOutcome {
        score: 0.0,
        normalized_score: 0.0,
        message: message.into(),
    }
}

fn ok(message: impl Into<String>) -> CheckerOutcome {
    CheckerOutcome {
        score: 100.0,
        normalized_score: 1.0,
        message: message.into(),
    }
}

fn compare_token_counts(out: &[&str], ans: &[&str]) -> Option<CheckerOutcome> {
    if out.len() != ans.len() {
        return Some(wrong(format!(
            "token count mismatch: expected {}, got {}",
            ans.len(),
            out.len()
        )));
    }
    None
}

fn icmp(output: &str, answer: &str) -> CheckerOutcome {
    let out = tokens(output);
    let ans = tokens(answer);
    if let Some(mismatch) = compare_token_counts(&out, &ans) {
        return mismatch;
    }
    for (i, (o, a)) in out.iter().zip(ans.iter()).enumerate() {
        let ov: Result<i64, _> = o.parse();
        let av: Result<i64, _> = a.parse();
        match (ov, av) {
            (Ok(ov), Ok(av)) if ov == av => continue,
            _ => return wrong(format!("integer mismatch at token {i}: expected {a}, got {o}")),
        }
    }
    ok("integers match")
}

fn ncmp_with_tolerance(output: &str, answer: &str, tolerance: f64) -> CheckerOutcome {
    let out = tokens(output);
    let ans = tokens(answer);
    if let Some(mismatch) = compare_token_counts(&out, &ans) {
        return mismatch;
    }
    for (i, (o, a)) in out.iter().zip(ans.iter()).enumerate() {
        let ov: Result<f64, _> = o.parse();
        let av: Result<f64, _> = a.parse();
        match (ov, av) {
            (Ok(ov), Ok(av)) if (ov - av).abs() <= tolerance * av.abs().max(1.0) => continue,
            _ => return wrong(format!("numeric mismatch at token {i}: expected {a}, got {o}")),
        }
    }
    ok("numbers match within tolerance")
}

fn wcmp(output: &str, answer: &str) -> CheckerOutcome {
    let out = tokens(output);
    let ans = tokens(answer);
    if let Some(mismatch) = compare_token_counts(&out, &ans) {
        return mismatch;
    }
    for (i, (o, a)) in out.iter().zip(ans.iter()).enumerate() {
        if o != a {
            return wrong(format!("token mismatch at token {i}: expected '{a}', got '{o}'"));
        }
    }
    ok("tokens match exactly")
}

fn case_insensitive(output: &str, answer: &str, inner: fn(&str, &str) -> CheckerOutcome) -> CheckerOutcome {
    inner(&output.to_lowercase(), &answer.to_lowercase())
}

fn hcmp(output: &str, answer: &str) -> CheckerOutcome {
    // Huge-integer compare: strip leading zeros, compare digit strings.
    let normalize = |s: &str| -> String {
        let t = s.trim();
        let (sign, digits) = if let Some(rest) = t.strip_prefix('-') {
            ("-", rest)
        } else {
            ("", t)
        };
        let trimmed = digits.trim_start_matches('0');
        let trimmed = if trimmed.is_empty() { "0" } else { trimmed };
        format!("{sign}{trimmed}")
    };
    let out: Vec<String> = tokens(output).iter().map(|t| normalize(t)).collect();
    let ans: Vec<String> = tokens(answer).iter().map(|t| normalize(t)).collect();
    if out.len() != ans.len() {
        return wrong("token count mismatch");
    }
    if out == ans {
        ok("huge integers match")
    } else {
        wrong("huge integer mismatch")
    }
}

fn lcmp(output: &str, answer: &str) -> CheckerOutcome {
    let out_lines: Vec<&str> = output.lines().map(|l| l.trim_end()).collect();
    let ans_lines: Vec<&str> = answer.lines().map(|l| l.trim_end()).collect();
    if out_lines == ans_lines {
        ok("lines match")
    } else {
        wrong("line mismatch")
    }
}

fn uncmp(output: &str, answer: &str) -> CheckerOutcome {
    let mut out: Vec<&str> = tokens(output);
    let mut ans: Vec<&str> = tokens(answer);
    out.sort_unstable();
    ans.sort_unstable();
    if out == ans {
        ok("tokens match as a multiset")
    } else {
        wrong("multiset mismatch")
    }
}

fn yesno(output: &str, answer: &str) -> CheckerOutcome {
    let out = output.trim().to_lowercase();
    let ans = answer.trim().to_lowercase();
    let normalize = |s: &str| matches!(s, "yes" | "y" | "true" | "1");
    if normalize(&out) == normalize(&ans) {
        ok("yes/no matches")
    } else {
        wrong(format!("expected '{answer}', got '{output}'"))
    }
}

fn nyesno(output: &str, answer: &str) -> CheckerOutcome {
    let out = tokens(output);
    let ans = tokens(answer);
    if out.len() != ans.len() {
        return wrong("token count mismatch");
    }
    let normalize = |s: &str| matches!(s.to_lowercase().as_str(), "yes" | "y" | "true" | "1");
    for (i, (o, a)) in out.iter().zip(ans.iter()).enumerate() {
        if normalize(o) != normalize(a) {
            return wrong(format!("yes/no mismatch at token {i}"));
        }
    }
    ok("yes/no sequence matches")
}

/// Dispatches to the matching built-in comparator. `name` must be one of
/// [`crate::model::BUILTIN_CHECKER_NAMES`].
pub fn run_builtin_checker(name: &str, output: &str, answer: &str) -> Option<CheckerOutcome> {
    Some(match name {
        "icmp" => icmp(output, answer),
        "ncmp" | "rncmp" => ncmp_with_tolerance(output, answer, 1e-6),
        "wcmp" | "acmp" => wcmp(output, answer),
        "rcmp" => ncmp_with_tolerance(output, answer, 1e-6),
        "rcmp4" => ncmp_with_tolerance(output, answer, 1e-4),
        "rcmp6" | "dcmp" => ncmp_with_tolerance(output, answer, 1e-6),
        "rcmp9" => ncmp_with_tolerance(output, answer, 1e-9),
        "fcmp" => ncmp_with_tolerance(output, answer, 1e-4),
        "hcmp" => hcmp(output, answer),
        "lcmp" => lcmp(output, answer),
        "uncmp" => uncmp(output, answer),
        "caseicmp" => case_insensitive(output, answer, icmp),
        "casencmp" => case_insensitive(output, answer, |o, a| ncmp_with_tolerance(o, a, 1e-6)),
        "casewcmp" => case_insensitive(output, answer, wcmp),
        "yesno" => yesno(output, answer),
        "nyesno" => nyesno(output, answer),
        _ => return None,
    })
}

pub fn is_builtin_checker(name: &str) -> bool {
    BUILTIN_CHECKER_NAMES.contains(&name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn icmp_accepts_matching_integers() {
        let result = run_builtin_checker("icmp", "1 2 3", "1 2 3").unwrap();
        assert_eq!(result.normalized_score, 1.0);
    }

    #[test]
    fn icmp_rejects_mismatched_integers() {
        let result = run_builtin_checker("icmp", "1 2 4", "1 2 3").unwrap();
        assert_eq!(result.normalized_score, 0.0);
    }

    #[test]
    fn ncmp_accepts_sum_example_from_scenario() {
        // §8 scenario 1: a+b where a=1 b=2, expected output "3".
        let result = run_builtin_checker("ncmp", "3", "3").unwrap();
        assert_eq!(result.normalized_score, 1.0);
    }

    #[test]
    fn ncmp_rejects_wrong_answer_scenario() {
        // §8 scenario 2: source computes a*b instead of a+b.
        let result = run_builtin_checker("ncmp", "2", "3").unwrap();
        assert_eq!(result.normalized_score, 0.0);
    }

    #[test]
    fn ncmp_tolerates_small_floating_error() {
        let result = run_builtin_checker("ncmp", "1.0000001", "1.0").unwrap();
        assert_eq!(result.normalized_score, 1.0);
    }

    #[test]
    fn wcmp_is_whitespace_insensitive_but_token_exact() {
        let result = run_builtin_checker("wcmp", "hello   world", "hello world").unwrap();
        assert_eq!(result.normalized_score, 1.0);
    }

    #[test]
    fn yesno_accepts_case_insensitive() {
        let result = run_builtin_checker("yesno", "YES", "yes").unwrap();
        assert_eq!(result.normalized_score, 1.0);
    }

    #[test]
    fn uncmp_ignores_order() {
        let result = run_builtin_checker("uncmp", "3 1 2", "1 2 3").unwrap();
        assert_eq!(result.normalized_score, 1.0);
    }

    #[test]
    fn unknown_name_returns_none() {
        assert!(run_builtin_checker("not-a-checker", "1", "1").is_none());
    }

    #[test]
    fn every_advertised_name_is_dispatchable() {
        for name in BUILTIN_CHECKER_NAMES {
            assert!(
                run_builtin_checker(name, "1", "1").is_some(),
                "builtin checker '{name}' has no dispatch arm"
            );
        }
    }
}
