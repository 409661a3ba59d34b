use mini_disk::shell::{run_script, start_shell};

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    // 带参数时按脚本执行，否则进入交互式 shell
    match std::env::args().nth(1) {
        Some(script) => run_script(&script),
        None => start_shell(),
    }
}
