use kb_console::{Action, DraftField};
use kb_core::{DocumentMode, PageSize};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Page(Action),
    /// 切换当前知识库（写入本地存储后重新加载）
    Use(String),
    Show,
    Help,
    Quit,
}

pub const HELP: &str = "\
命令:
  search <关键字>        搜索文件（500ms 防抖，空关键字清除搜索）
  page <n>               跳转到第 n 页
  size <10|20|30|50>     每页条数
  add                    打开添加文件菜单
  add text | add file    知识入库 / 文件入库
  name <文件名>          填写文件名称
  path <路径>            填写上传文件路径
  text <内容>            填写文本内容
  submit                 提交
  cancel                 关闭添加文件菜单或对话框
  use <知识库>           切换知识库
  reload                 重新加载
  show                   显示当前页面
  help                   帮助
  quit                   退出";

pub fn parse(line: &str) -> Result<Command, String> {
    let line = line.trim();
    let (head, rest) = match line.split_once(char::is_whitespace) {
        Some((head, rest)) => (head, rest.trim()),
        None => (line, ""),
    };

    let cmd = match head {
        "search" => Command::Page(Action::SearchInput(rest.to_string())),
        "page" => {
            let page: u32 = rest
                .parse()
                .map_err(|_| format!("无效的页码: {:?}", rest))?;
            Command::Page(Action::ChangePage(page))
        }
        "size" => {
            let size = rest
                .parse::<u32>()
                .ok()
                .and_then(|n| PageSize::new(n).ok())
                .ok_or_else(|| format!("每页条数只能是 {:?}", PageSize::OPTIONS))?;
            Command::Page(Action::ChangePageSize(size))
        }
        "add" => match rest {
            "" => Command::Page(Action::OpenAddOptions),
            "text" => Command::Page(Action::OpenAddDialog(DocumentMode::Text)),
            "file" => Command::Page(Action::OpenAddDialog(DocumentMode::File)),
            other => return Err(format!("未知的入库方式: {}", other)),
        },
        "name" => Command::Page(Action::EditDraft(DraftField::FileName, rest.to_string())),
        "path" => Command::Page(Action::EditDraft(DraftField::FilePath, rest.to_string())),
        "text" => Command::Page(Action::EditDraft(DraftField::FileText, rest.to_string())),
        "submit" => Command::Page(Action::SubmitAddDialog),
        "cancel" => Command::Page(Action::CloseAddDialog),
        "use" if !rest.is_empty() => Command::Use(rest.to_string()),
        "use" => return Err("请指定知识库名称".to_string()),
        "reload" => Command::Page(Action::Mount),
        "show" | "" => Command::Show,
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        other => return Err(format!("未知命令: {}（输入 help 查看帮助）", other)),
    };
    Ok(cmd)
}
