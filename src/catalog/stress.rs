//! Stress tests: long scripts, many jobs, deep alias expansion.

use super::{Check, job_id, secs};
use crate::assertions::{
    contains_all, contains_none_ci, content_lines, count_matches, count_occurrences,
};
use crate::case::{Target, TestCase, Verdict};

pub(super) fn cases() -> Vec<TestCase> {
    vec![
        TestCase::new("many_commands", many_commands),
        TestCase::new("many_background_jobs", many_background_jobs),
        TestCase::new("rapid_cd", rapid_cd),
        TestCase::new("alias_chain", alias_chain),
        TestCase::new("alias_recursive", alias_recursive),
        TestCase::new("long_command_line", long_command_line),
        TestCase::new("empty_lines", empty_lines),
        TestCase::new("garbage_collector", garbage_collector),
        TestCase::new("garbage_collector_with_sleep", garbage_collector_with_sleep),
    ]
}

/// Diagnostics a full job table produces.
const OVERFLOW: [&str; 2] = ["full", "overflow"];

fn many_commands(sh: &Target) -> Check {
    let commands = vec!["echo test"; 50];
    Ok(sh.send(commands).deadline(secs(30)).check(|t| {
        let found = count_occurrences(&t.stdout, "test");
        // Allow some margin.
        Verdict::check(found >= 45, "~50 test outputs", format!("{found} found"))
    }))
}

fn many_background_jobs(sh: &Target) -> Check {
    let id = job_id()?;
    let mut commands = vec!["sleep 100 &"; 20];
    commands.push("jobs");
    Ok(sh
        .send(commands)
        .kill_on_quit()
        .deadline(secs(60))
        .check(|t| {
            let listed = count_matches(&t.stdout, &id);
            Verdict::check(listed >= 15, "~20 jobs", format!("{listed} found"))
        }))
}

fn rapid_cd(sh: &Target) -> Check {
    let mut commands: Vec<&str> = (0..20).flat_map(|_| ["cd /tmp", "cd /var"]).collect();
    commands.push("pwd");
    Ok(sh.send(commands).deadline(secs(15)).check(|t| {
        Verdict::check(t.stdout.contains("/var"), "/var", &t.stdout)
    }))
}

fn alias_chain(sh: &Target) -> Check {
    // /var/log -> /var -> /
    Ok(sh
        .send(["alias cd2out='cd .. && cd ..'", "cd /var/log", "cd2out", "pwd"])
        .check(|t| {
            Verdict::check(
                content_lines(&t.stdout, &sh.prompt).contains(&"/"),
                "/ after cd2out from /var/log",
                &t.stdout,
            )
        }))
}

fn alias_recursive(sh: &Target) -> Check {
    Ok(sh
        .send(["alias a='echo hello'", "alias b='a'", "alias c='b'", "c"])
        .check(|t| {
            Verdict::check(
                t.stdout.contains("hello"),
                "hello from recursive alias c->b->a",
                &t.stdout,
            )
        }))
}

fn long_command_line(sh: &Target) -> Check {
    let args: Vec<String> = (0..15).map(|i| format!("arg{i}")).collect();
    let command = format!("echo {}", args.join(" "));
    Ok(sh.send([command]).deadline(secs(10)).check(|t| {
        Verdict::check(
            contains_all(&t.stdout, &["arg0", "arg14"]),
            "all arguments echoed",
            &t.stdout,
        )
    }))
}

fn empty_lines(sh: &Target) -> Check {
    Ok(sh
        .send(["", "   ", "\t", "echo test", ""])
        .deadline(secs(10))
        .check(|t| Verdict::check(t.stdout.contains("test"), "test", &t.stdout)))
}

/// Finished background jobs must be reclaimed before the job table fills.
fn garbage_collector(sh: &Target) -> Check {
    let mut commands = vec!["true &"; 120];
    commands.push("jobs");
    Ok(sh.send(commands).deadline(secs(60)).check(|t| {
        Verdict::check(
            contains_none_ci(&t.combined(), &OVERFLOW),
            "no overflow error",
            "job list overflow detected",
        )
    }))
}

fn garbage_collector_with_sleep(sh: &Target) -> Check {
    // Some of the first wave finishes while the pwd commands run.
    let mut commands = vec!["sleep 1 &"; 30];
    commands.extend(["pwd"; 5]);
    commands.extend(["sleep 1 &"; 30]);
    commands.push("jobs");
    Ok(sh
        .send(commands)
        .kill_on_quit()
        .deadline(secs(120))
        .check(|t| {
            Verdict::check(
                contains_none_ci(&t.combined(), &OVERFLOW),
                "no overflow error",
                "job list overflow detected",
            )
        }))
}
