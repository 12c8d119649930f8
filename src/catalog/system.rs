//! System tests: command chains and job control across several commands.

use super::{Check, job_id, secs};
use crate::assertions::{appears_in_order, contains_all, contains_any, count_matches};
use crate::case::{Target, TestCase, Verdict};

pub(super) fn cases() -> Vec<TestCase> {
    vec![
        TestCase::new("complex_command_success", complex_command_success),
        TestCase::new("complex_command_fail", complex_command_fail),
        TestCase::new("triple_chain", triple_chain),
        TestCase::new("builtin_chain", builtin_chain),
        TestCase::new("fg_basic", fg_basic),
        TestCase::new("fg_empty_list", fg_empty_list),
        TestCase::new("fg_nonexistent", fg_nonexistent),
        TestCase::new("multiple_background_jobs", multiple_background_jobs),
        TestCase::new("job_id_reuse", job_id_reuse),
    ]
}

fn complex_command_success(sh: &Target) -> Check {
    Ok(sh.send(["echo first && echo second"]).check(|t| {
        Verdict::check(
            contains_all(&t.stdout, &["first", "second"]),
            "first and second",
            &t.stdout,
        )
    }))
}

fn complex_command_fail(sh: &Target) -> Check {
    Ok(sh
        .send(["cd /nonexistent && echo should_not_appear"])
        .check(|t| {
            Verdict::check(
                !t.stdout.contains("should_not_appear"),
                "should_not_appear NOT in output",
                &t.stdout,
            )
        }))
}

fn triple_chain(sh: &Target) -> Check {
    Ok(sh.send(["echo 1 && echo 2 && echo 3"]).check(|t| {
        Verdict::check(
            appears_in_order(&t.stdout, &["1", "2", "3"]),
            "1 then 2 then 3",
            &t.stdout,
        )
    }))
}

fn builtin_chain(sh: &Target) -> Check {
    Ok(sh.send(["pwd && showpid"]).check(|t| {
        Verdict::check(
            contains_all(&t.stdout, &["/", "smash pid is"]),
            "pwd and showpid output",
            &t.stdout,
        )
    }))
}

fn fg_basic(sh: &Target) -> Check {
    Ok(sh.send(["sleep 1 &", "fg 0"]).check(|t| {
        let combined = t.combined();
        Verdict::check(
            !contains_any(&combined, &["does not exist", "invalid"]),
            "fg to work",
            combined,
        )
    }))
}

fn fg_empty_list(sh: &Target) -> Check {
    Ok(sh.send(["fg"]).check(|t| {
        let combined = t.combined();
        Verdict::check(
            contains_any(&combined, &["jobs list is empty", "job list is empty"]),
            "jobs list is empty",
            combined,
        )
    }))
}

fn fg_nonexistent(sh: &Target) -> Check {
    Ok(sh.send(["fg 99"]).check(|t| {
        let combined = t.combined();
        Verdict::check(combined.contains("does not exist"), "job id 99 does not exist", combined)
    }))
}

fn multiple_background_jobs(sh: &Target) -> Check {
    let id = job_id()?;
    Ok(sh
        .send(["sleep 100 &", "sleep 100 &", "sleep 100 &", "jobs"])
        .kill_on_quit()
        .deadline(secs(20))
        .check(|t| {
            let listed = count_matches(&t.stdout, &id);
            Verdict::check(listed >= 3, "3 jobs", format!("{listed} jobs found"))
        }))
}

fn job_id_reuse(sh: &Target) -> Check {
    Ok(sh
        .send(["sleep 100 &", "sleep 100 &", "kill 9 0", "sleep 100 &", "jobs"])
        .kill_on_quit()
        .deadline(secs(15))
        .check(|t| {
            Verdict::check(
                contains_all(&t.stdout, &["[0]", "[1]"]),
                "jobs 0 and 1",
                &t.stdout,
            )
        }))
}
