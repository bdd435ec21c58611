use colored::Colorize;

pub fn section(title: &str) {
    println!("\n{} {}", "==>".blue().bold(), title.bold());
}

pub fn step(index: usize, total: usize, name: &str) {
    println!("{} {}", format!("[{}/{}]", index, total).green().bold(), name);
}

pub fn error(message: &str) {
    eprintln!("{} {}", "error:".red().bold(), message);
}

pub fn notice(message: &str) {
    println!("{} {}", "::".yellow().bold(), message);
}
