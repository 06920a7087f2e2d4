use std::fmt::Write;

use kb_console::{AddDocumentState, DatasetState, ListStatus, Notification};
use kb_core::{DocumentMode, PageSize};
use unicode_width::UnicodeWidthStr;

const NOTICE: &str = "问题和答案只有在解析成功后才能回答。";

pub fn page(knowledge_base: &str, state: &DatasetState) -> String {
    let mut out = String::new();
    let title = if knowledge_base.is_empty() {
        "数据集".to_string()
    } else {
        format!("数据集 · {}", knowledge_base)
    };
    let _ = writeln!(out, "== {} ==", title);
    let _ = writeln!(out, "! {}", NOTICE);
    let _ = writeln!(out, "搜索: [{}]", state.search_input());

    match state.list_status() {
        ListStatus::Loading => {
            let _ = writeln!(out, "(加载中…)");
        }
        ListStatus::Failed(msg) => {
            let _ = writeln!(out, "(列表加载失败: {})", msg);
        }
        ListStatus::Idle | ListStatus::Loaded => {}
    }

    out.push_str(&table(state));

    let p = state.pagination();
    let _ = writeln!(
        out,
        "第 {}/{} 页 · 共 {} 条 · 每页 {} 条 {:?}",
        p.current_page(),
        p.total_pages(),
        p.total_items(),
        p.page_size().get(),
        PageSize::OPTIONS
    );

    out.push_str(&add_document(state.add_document()));
    out
}

fn table(state: &DatasetState) -> String {
    let headers = ["文件名", "创建时间", "状态"];
    let rows: Vec<[&str; 3]> = state
        .files()
        .iter()
        .map(|f| [f.file_path.as_str(), f.create_time.as_str(), f.status.as_str()])
        .collect();

    let mut widths = headers.map(display_width);
    for row in &rows {
        for (w, cell) in widths.iter_mut().zip(row.iter()) {
            *w = (*w).max(display_width(cell));
        }
    }

    let mut out = String::new();
    out.push_str(&row_line(&headers, &widths));
    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    let _ = writeln!(out, "{}", rule.join("-+-"));
    if rows.is_empty() {
        let _ = writeln!(out, "暂无数据");
    }
    for row in &rows {
        out.push_str(&row_line(row, &widths));
    }
    out
}

fn row_line(cells: &[&str; 3], widths: &[usize; 3]) -> String {
    let padded: Vec<String> = cells
        .iter()
        .zip(widths.iter())
        .map(|(cell, w)| {
            let pad = w.saturating_sub(display_width(cell));
            format!("{}{}", cell, " ".repeat(pad))
        })
        .collect();
    format!("{}\n", padded.join(" | ").trim_end())
}

/// 终端显示列宽（CJK 全角占两列）
fn display_width(s: &str) -> usize {
    UnicodeWidthStr::width(s)
}

fn add_document(state: &AddDocumentState) -> String {
    match state {
        AddDocumentState::Closed => String::new(),
        AddDocumentState::SelectingType => format!(
            "[添加文件] add text → {} | add file → {}\n",
            DocumentMode::Text.label(),
            DocumentMode::File.label()
        ),
        AddDocumentState::Editing { mode, draft } | AddDocumentState::Submitting { mode, draft } => {
            let mut out = String::new();
            let _ = writeln!(out, "-- {} --", mode.label());
            let _ = writeln!(out, "  名称: {}", draft.file_name);
            match mode {
                DocumentMode::Text => {
                    let _ = writeln!(out, "  内容: {}", draft.file_text);
                }
                DocumentMode::File => {
                    let _ = writeln!(out, "  文件: {}", draft.file_path);
                }
            }
            if state.is_submitting() {
                let _ = writeln!(out, "  (提交中…)");
            } else {
                let _ = writeln!(out, "  submit 提交 / cancel 取消");
            }
            out
        }
    }
}

pub fn notification(n: &Notification) -> String {
    let mark = if n.is_destructive() { "✗" } else { "✓" };
    format!("{} {}: {}", mark, n.title, n.description)
}
