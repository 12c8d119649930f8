//! Module tests: one built-in or external command at a time.

use super::{Check, job_entry, job_id, secs};
use crate::assertions::{
    any_line, contains_any, contains_none_ci, content_lines, count_content_lines, count_matches,
    has_exact_line, matches_pattern,
};
use crate::case::{Fixture, Target, TestCase, Verdict};

pub(super) fn cases() -> Vec<TestCase> {
    vec![
        TestCase::new("showpid", showpid),
        TestCase::new("showpid_with_args", showpid_with_args),
        TestCase::new("pwd", pwd),
        TestCase::new("pwd_with_args", pwd_with_args),
        TestCase::new("cd_basic", cd_basic),
        TestCase::new("cd_parent", cd_parent),
        TestCase::new("cd_dash", cd_dash),
        TestCase::new("cd_dash_no_oldpwd", cd_dash_no_oldpwd),
        TestCase::new("cd_nonexistent", cd_nonexistent),
        TestCase::new("cd_to_file", cd_to_file),
        TestCase::new("cd_wrong_args", cd_wrong_args),
        TestCase::new("jobs_empty", jobs_empty),
        TestCase::new("jobs_with_background", jobs_with_background),
        TestCase::new("kill_job", kill_job),
        TestCase::new("kill_nonexistent", kill_nonexistent),
        TestCase::new("kill_invalid_args", kill_invalid_args),
        TestCase::new("diff_same_files", diff_same_files),
        TestCase::new("diff_different_files", diff_different_files),
        TestCase::new("diff_nonexistent", diff_nonexistent),
        TestCase::new("diff_directory", diff_directory),
        TestCase::new("diff_wrong_args", diff_wrong_args),
        TestCase::new("quit", quit),
        TestCase::new("quit_kill", quit_kill),
        TestCase::new("quit_invalid_arg", quit_invalid_arg),
        TestCase::new("external_ls", external_ls),
        TestCase::new("external_echo", external_echo),
        TestCase::new("external_background", external_background),
        TestCase::new("alias_basic", alias_basic),
        TestCase::new("alias_list", alias_list),
        TestCase::new("unalias", unalias),
    ]
}

/// Run `commands` and require `needle` somewhere in stdout or stderr.
fn expect_diagnostic(sh: &Target, commands: &[&str], needle: &str, expected: &str) -> Check {
    Ok(sh.send(commands.iter().copied()).check(|t| {
        let combined = t.combined();
        Verdict::check(combined.contains(needle), expected, combined)
    }))
}

fn showpid(sh: &Target) -> Check {
    Ok(sh.send(["showpid"]).check(|t| {
        Verdict::check(t.stdout.contains("smash pid is"), "smash pid is <PID>", &t.stdout)
    }))
}

fn showpid_with_args(sh: &Target) -> Check {
    expect_diagnostic(
        sh,
        &["showpid arg1"],
        "expected 0 arguments",
        "smash error: showpid: expected 0 arguments",
    )
}

fn pwd(sh: &Target) -> Check {
    Ok(sh.send(["pwd"]).check(|t| {
        Verdict::check(
            any_line(&t.stdout, &sh.prompt, |line| line.starts_with('/')),
            "/<path>",
            &t.stdout,
        )
    }))
}

fn pwd_with_args(sh: &Target) -> Check {
    expect_diagnostic(
        sh,
        &["pwd arg1"],
        "expected 0 arguments",
        "smash error: pwd: expected 0 arguments",
    )
}

fn cd_basic(sh: &Target) -> Check {
    Ok(sh.send(["cd /tmp", "pwd"]).check(|t| {
        Verdict::check(t.stdout.contains("/tmp"), "/tmp in output", &t.stdout)
    }))
}

fn cd_parent(sh: &Target) -> Check {
    Ok(sh.send(["cd /tmp", "cd ..", "pwd"]).check(|t| {
        let last_path = content_lines(&t.stdout, &sh.prompt)
            .into_iter()
            .rev()
            .find(|line| line.starts_with('/'));
        Verdict::check(last_path == Some("/"), "/", &t.stdout)
    }))
}

fn cd_dash(sh: &Target) -> Check {
    Ok(sh.send(["cd /tmp", "cd /var", "cd -", "pwd"]).check(|t| {
        Verdict::check(t.stdout.contains("/tmp"), "/tmp in output", &t.stdout)
    }))
}

fn cd_dash_no_oldpwd(sh: &Target) -> Check {
    Ok(sh.send(["cd -"]).check(|t| {
        let combined = t.combined();
        let passed = combined.to_lowercase().contains("old pwd not set")
            || combined.contains("OLDPWD not set");
        Verdict::check(passed, "old pwd not set error", combined)
    }))
}

fn cd_nonexistent(sh: &Target) -> Check {
    Ok(sh.send(["cd /nonexistent_path_12345"]).check(|t| {
        let combined = t.combined();
        let passed =
            combined.contains("does not exist") || combined.to_lowercase().contains("no such");
        Verdict::check(passed, "directory does not exist error", combined)
    }))
}

fn cd_to_file(sh: &Target) -> Check {
    let file = Fixture::empty()?;
    Ok(sh.send([format!("cd {}", file.arg())]).check(|t| {
        let combined = t.combined();
        Verdict::check(
            combined.to_lowercase().contains("not a directory"),
            "not a directory error",
            combined,
        )
    }))
}

fn cd_wrong_args(sh: &Target) -> Check {
    Ok(sh.send(["cd"]).check(|t| {
        let combined = t.combined();
        Verdict::check(
            contains_any(&combined, &["expected 1 argument", "invalid arguments"]),
            "expected 1 argument",
            combined,
        )
    }))
}

fn jobs_empty(sh: &Target) -> Check {
    let id = job_id()?;
    Ok(sh.send(["jobs"]).check(|t| {
        let listed = content_lines(&t.stdout, &sh.prompt)
            .into_iter()
            .filter(|line| id.is_match(line))
            .count();
        Verdict::check(listed == 0, "no jobs listed", &t.stdout)
    }))
}

fn jobs_with_background(sh: &Target) -> Check {
    let entry = job_entry("sleep")?;
    Ok(sh
        .send(["sleep 10 &", "jobs"])
        .kill_on_quit()
        .deadline(secs(10))
        .check(|t| {
            Verdict::check(
                matches_pattern(&t.stdout, &entry),
                "job listing with sleep",
                &t.stdout,
            )
        }))
}

fn kill_job(sh: &Target) -> Check {
    Ok(sh.send(["sleep 100 &", "kill 9 0"]).check(|t| {
        Verdict::check(
            t.stdout.contains("signal 9 was sent to pid"),
            "signal 9 was sent to pid",
            &t.stdout,
        )
    }))
}

fn kill_nonexistent(sh: &Target) -> Check {
    expect_diagnostic(sh, &["kill 9 99"], "job id 99 does not exist", "job id 99 does not exist")
}

fn kill_invalid_args(sh: &Target) -> Check {
    expect_diagnostic(sh, &["kill abc 0"], "invalid arguments", "invalid arguments")
}

/// Diff two fixture files and expect `result` printed on a line of its own.
fn diff_fixtures(sh: &Target, first: &str, second: &str, result: &str) -> Check {
    let a = Fixture::with_contents(first)?;
    let b = Fixture::with_contents(second)?;
    Ok(sh.send([format!("diff {} {}", a.arg(), b.arg())]).check(|t| {
        Verdict::check(has_exact_line(&t.stdout, result, &sh.prompt), result, &t.stdout)
    }))
}

fn diff_same_files(sh: &Target) -> Check {
    diff_fixtures(sh, "test content\n", "test content\n", "0")
}

fn diff_different_files(sh: &Target) -> Check {
    diff_fixtures(sh, "content 1\n", "content 2\n", "1")
}

fn diff_nonexistent(sh: &Target) -> Check {
    expect_diagnostic(
        sh,
        &["diff /nonexistent1 /nonexistent2"],
        "expected valid paths",
        "expected valid paths for files",
    )
}

fn diff_directory(sh: &Target) -> Check {
    expect_diagnostic(sh, &["diff /tmp /var"], "paths are not files", "paths are not files")
}

fn diff_wrong_args(sh: &Target) -> Check {
    expect_diagnostic(sh, &["diff /tmp"], "expected 2 arguments", "expected 2 arguments")
}

fn quit(sh: &Target) -> Check {
    Ok(sh.send(Vec::<String>::new()).check(|t| {
        Verdict::check(t.exit_code == Some(0), "exit code 0", t.describe_exit())
    }))
}

fn quit_kill(sh: &Target) -> Check {
    Ok(sh
        .send(["sleep 100 &", "sleep 100 &"])
        .kill_on_quit()
        .deadline(secs(15))
        .check(|t| {
            Verdict::check(
                t.stdout.contains("SIGTERM") && t.exit_code == Some(0),
                "SIGTERM messages and exit 0",
                format!("stdout: {}, {}", t.stdout, t.describe_exit()),
            )
        }))
}

fn quit_invalid_arg(sh: &Target) -> Check {
    expect_diagnostic(sh, &["quit foo"], "unexpected arguments", "unexpected arguments")
}

fn external_ls(sh: &Target) -> Check {
    Ok(sh.send(["ls"]).check(|t| {
        Verdict::check(
            count_content_lines(&t.stdout, &sh.prompt) > 0,
            "file listing",
            &t.stdout,
        )
    }))
}

fn external_echo(sh: &Target) -> Check {
    Ok(sh.send(["echo hello world"]).check(|t| {
        Verdict::check(t.stdout.contains("hello world"), "hello world", &t.stdout)
    }))
}

fn external_background(sh: &Target) -> Check {
    let entry = job_entry("sleep")?;
    Ok(sh
        .send(["sleep 5 &", "jobs"])
        .kill_on_quit()
        .deadline(secs(10))
        .check(|t| {
            let listed = count_matches(&t.stdout, &entry);
            Verdict::check(listed > 0, "sleep job in listing", &t.stdout)
        }))
}

fn alias_basic(sh: &Target) -> Check {
    Ok(sh.send(["alias ll='ls -l'", "ll"]).check(|t| {
        let passed = t.stdout.contains("total")
            || t.stdout.contains("rw")
            || t.stdout.split('\n').count() > 3;
        Verdict::check(passed, "ls -l output", &t.stdout)
    }))
}

fn alias_list(sh: &Target) -> Check {
    Ok(sh.send(["alias ll='ls'", "ll"]).check(|t| {
        let combined = t.combined();
        Verdict::check(
            contains_none_ci(&combined, &["not found", "error"]),
            "alias ll to work",
            combined,
        )
    }))
}

fn unalias(sh: &Target) -> Check {
    Ok(sh.send(["alias ll='ls -l'", "unalias ll", "alias"]).check(|t| {
        let still_listed = content_lines(&t.stdout, &sh.prompt)
            .iter()
            .any(|line| line.contains("ll="));
        Verdict::check(!still_listed, "ll removed from aliases", &t.stdout)
    }))
}
