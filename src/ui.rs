// src/ui.rs

use crate::{constants, symbols, utils};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};

pub fn plain(message: &str) {
    println!("{}", message);
}

pub fn info(message: &str) {
    println!("{} {}", *symbols::INFO, message);
}

pub fn warn(message: &str) {
    println!("{} {}", *symbols::WARN, message);
}

pub fn error(message: &str) {
    eprintln!("{} {}", *symbols::ERROR, message.red());
}

fn rule(left: char, right: char) -> String {
    format!("{}{}{}", left, "─".repeat(constants::UI_WIDTH - 2), right)
}

pub fn print_header(title: &str) {
    let line = "═".repeat(constants::UI_WIDTH);
    println!("\n{}\n {}\n{}", line, title.cyan().bold(), line);
}

pub fn print_sub_header(title: &str) {
    println!("\n--- {} ---", title.bold());
}

/// 按文件数量推进的进度条，当前文件与状态显示在消息区
pub fn new_tasks_progress_bar(total: u64, prefix: &str) -> ProgressBar {
    let pbar = ProgressBar::new(total);
    let style = ProgressStyle::with_template(
        "{prefix:7.bold.cyan} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos:>3}/{len:3} {wide_msg}",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar())
    .progress_chars("#>-");
    pbar.set_style(style);
    pbar.set_prefix(prefix.to_string());
    pbar
}

fn read_line() -> io::Result<String> {
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

/// 读取一行输入；直接回车时返回默认值 (没有默认值则为空串)
pub fn prompt(message: &str, default: Option<&str>) -> io::Result<String> {
    match default {
        Some(d) => print!("\n>>> {} (默认: {}): ", message, d),
        None => print!("\n>>> {}: ", message),
    }
    let input = read_line()?;
    Ok(if input.is_empty() { default.unwrap_or_default().to_string() } else { input })
}

pub fn prompt_hidden(message: &str) -> io::Result<String> {
    print!("\n>>> {}: ", message);
    io::stdout().flush()?;
    rpassword::read_password()
}

/// 是/否确认；输入流出错时视为否
pub fn confirm(question: &str, default_yes: bool) -> bool {
    let hint = if default_yes { "(Y/n)" } else { "(y/N)" };
    loop {
        let Ok(answer) = prompt(&format!("{} {}", question, hint), None) else {
            return false;
        };
        match answer.to_lowercase().as_str() {
            "" => return default_yes,
            "y" | "yes" => return true,
            "n" | "no" => return false,
            _ => println!("{}", "无效输入，请输入 'y' 或 'n'。".red()),
        }
    }
}

fn print_menu(title: &str, options: &[String], instructions: &str) {
    println!("\n{}", rule('┌', '┐'));
    println!("  {}", title.cyan().bold());
    println!("{}", rule('├', '┤'));
    let width = options.len().to_string().len();
    for (i, option) in options.iter().enumerate() {
        println!("  [{}] {}", format!("{:<width$}", i + 1).yellow(), option);
    }
    println!("{}", rule('├', '┤'));
    println!("  {} (按 {} 可取消)", instructions, *symbols::CTRL_C);
    println!("{}", rule('└', '┘'));
}

/// 单选菜单，返回 0 基索引。空输入或读取失败返回 `None`，无效编号会提示后返回 `None`。
pub fn pick_one(options: &[String], title: &str, default: usize) -> Option<usize> {
    if options.is_empty() {
        warn("没有可选项。");
        return None;
    }
    print_menu(title, options, "请输入一个数字 (直接回车使用默认值)");
    let input = prompt("请输入你的选择", Some(&default.to_string())).ok()?;
    match input.parse::<usize>() {
        Ok(n) if (1..=options.len()).contains(&n) => Some(n - 1),
        _ if input.is_empty() => None,
        _ => {
            error(&format!("无效的选择 '{}'", input));
            None
        }
    }
}

/// 多选菜单，支持 "1, 3, 2-4, all"，返回被选中的选项文本
pub fn pick_many(options: &[String], title: &str, default: &str) -> Vec<String> {
    if options.is_empty() {
        return Vec::new();
    }
    print_menu(title, options, "支持格式: 1, 3, 2-4, all");
    let input = prompt("请输入你的选择", Some(default)).unwrap_or_default();
    utils::parse_selection_indices(&input, options.len())
        .into_iter()
        .map(|i| options[i].clone())
        .collect()
}
