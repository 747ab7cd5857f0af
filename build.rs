use std::env;

fn main() {
    // Set build-time environment variables
    let profile = env::var("PROFILE").unwrap_or_else(|_| "unknown".to_string());
    let target = env::var("TARGET").unwrap_or_else(|_| "unknown".to_string());

    println!("cargo:rustc-env=BUILD_PROFILE={}", profile);
    println!("cargo:rustc-env=BUILD_TARGET={}", target);

    // Add git info if available
    match std::process::Command::new("git")
        .args(["rev-parse", "--short", "HEAD"])
        .output()
    {
        Ok(git_hash) if git_hash.status.success() => {
            let git_hash_str = String::from_utf8_lossy(&git_hash.stdout).trim().to_string();
            println!("cargo:rustc-env=GIT_HASH={}", git_hash_str);

            if let Ok(git_status) = std::process::Command::new("git")
                .args(["status", "--porcelain"])
                .output()
            {
                let is_clean = git_status.stdout.is_empty();
                println!("cargo:rustc-env=GIT_CLEAN={}", if is_clean { "true" } else { "false" });
            }
        }
        _ => {
            println!("cargo:rustc-env=GIT_HASH=unknown");
            println!("cargo:rustc-env=GIT_CLEAN=unknown");
        }
    }

    let now = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
    println!("cargo:rustc-env=BUILD_DATE={}", now);
}
