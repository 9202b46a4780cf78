//! # Embedded Bootstrap Program
//!
//! Every generated pin manifest ends with this statically templated script.
//! It is deliberately redundant with the rest of the tool: a CI system or a
//! fresh clone can run the manifest file on its own to perform a minimal
//! clone-and-checkout of every pinned dependency, without the tool
//! installed. The data blocks written above the script are plain object
//! literals, so the interpreter reads them directly as module-level values.
//!
//! The script supports skip-if-already-cloned, shallow fetch of the pinned
//! revision, detached checkout, optional submodule initialization, and
//! command-line exclusion filters for dependencies (by name) and submodules
//! (by `repo:path`).

/// Appended verbatim to every rendered pin manifest.
pub(crate) const BOOTSTRAP_SCRIPT: &str = r#"
import argparse
from pathlib import Path
import re
import shlex
import subprocess


def main():
    parser = argparse.ArgumentParser(description="Source deps sync")
    parser.add_argument(
        "--exclude-submodule",
        nargs="*",
        help="Exclude submodules by regex (matched against '{project}:{path}')")
    parser.add_argument(
        "--exclude-dep",
        nargs="*",
        help="Exclude dependencies by regex")
    parser.add_argument(
        "--depth",
        type=int,
        default=0,
        help="Fetch revisions with --depth")
    parser.add_argument(
        "--submodules-depth",
        type=int,
        default=0,
        help="Update submodules with --depth")
    args = parser.parse_args()

    workspace_dir = Path(__file__).resolve().parent.parent
    for repo_name, revision in PINNED_VERSIONS.items():
        excluded = any(
            re.search(pattern, repo_name)
            for pattern in (args.exclude_dep or ()))
        if excluded:
            print(f"Excluding {repo_name} based on --exclude-dep")
            continue

        print(f"Syncing {repo_name}")
        repo_dir = workspace_dir / repo_name
        if not repo_dir.exists():
            print(f"  Cloning {repo_name}...")
            repo_dir.mkdir()
            run(["init"], repo_dir)
            run(["remote", "add", "origin", ORIGINS[repo_name]], repo_dir)
        fetch_args = ["fetch"]
        if args.depth > 0:
            fetch_args.append("--depth=1")
        fetch_args.extend(["origin", revision])
        run(fetch_args, repo_dir)
        run(["-c", "advice.detachedHead=false", "checkout", revision], repo_dir)
        if SUBMODULES.get(repo_name):
            print(f"  Initializing submodules for {repo_name}")
            cp = run(["submodule", "status"],
                     repo_dir,
                     silent=True,
                     capture_output=True)
            submodules = []
            for status_line in cp.stdout.decode().splitlines():
                submodule_path = status_line.split()[1]
                excluded = any(
                    re.search(pattern, f"{repo_name}:{submodule_path}")
                    for pattern in (args.exclude_submodule or ()))
                if excluded:
                    print(f"  Excluding {submodule_path} based on "
                          "--exclude-submodule")
                    continue
                submodules.append(submodule_path)

            update_args = ["submodule", "update", "--init"]
            if args.submodules_depth > 0:
                update_args.extend(["--depth", "1"])
            update_args.append("--")
            update_args.extend(submodules)
            run(update_args, repo_dir)


def run(args, cwd, *, capture_output=False, check=True, silent=False):
    args = ["git"] + args
    args_text = " ".join(shlex.quote(arg) for arg in args)
    if not silent:
        print(f"  [{cwd}]$ {args_text}")
    cp = subprocess.run(args, cwd=str(cwd), capture_output=capture_output)
    if check and cp.returncode != 0:
        detail = f":\n({cp.stderr.decode()})" if capture_output else ""
        raise RuntimeError(
            f"Git command failed: {args_text} (from {cwd}){detail}")
    return cp


if __name__ == "__main__":
    main()
"#;
