use crate::error::ParseError;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// 简化的 XML 节点: 只保留本地名 (去掉命名空间前缀)、文本和子节点
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlNode {
    pub name: String,
    pub text: String,
    pub children: Vec<XmlNode>,
}

impl XmlNode {
    fn from_start(e: &BytesStart<'_>) -> Self {
        Self {
            name: String::from_utf8_lossy(e.local_name().as_ref()).into_owned(),
            ..Self::default()
        }
    }

    /// 先序遍历 (含自身) 查找第一个同名节点, 区分大小写
    pub fn find_first(&self, local_name: &str) -> Option<&XmlNode> {
        if self.name == local_name {
            return Some(self);
        }
        self.children
            .iter()
            .find_map(|child| child.find_first(local_name))
    }

    /// 先序遍历 (含自身) 收集所有同名节点
    pub fn find_all<'a>(&'a self, local_name: &str) -> Vec<&'a XmlNode> {
        let mut found = Vec::new();
        self.collect(local_name, &mut found);
        found
    }

    fn collect<'a>(&'a self, local_name: &str, found: &mut Vec<&'a XmlNode>) {
        if self.name == local_name {
            found.push(self);
        }
        for child in &self.children {
            child.collect(local_name, found);
        }
    }

    /// 直接子节点
    pub fn child(&self, local_name: &str) -> Option<&XmlNode> {
        self.children.iter().find(|c| c.name == local_name)
    }

    /// 去空白后的文本, 空文本视为缺失
    pub fn text(&self) -> Option<&str> {
        let trimmed = self.text.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed)
        }
    }

    /// 第一个同名后代节点的文本
    pub fn text_of(&self, local_name: &str) -> Option<String> {
        self.find_first(local_name)
            .and_then(XmlNode::text)
            .map(str::to_string)
    }
}

/// 解析为节点树; 语法错误、没有根元素或根元素未闭合时报错
pub fn parse_tree(raw_text: &str) -> Result<XmlNode, ParseError> {
    let mut reader = Reader::from_str(raw_text.trim_start_matches('\u{feff}'));
    reader.config_mut().trim_text(true);

    let mut stack: Vec<XmlNode> = Vec::new();
    let mut root: Option<XmlNode> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                if stack.is_empty() && root.is_some() {
                    return Err(ParseError::MultipleRoots);
                }
                stack.push(XmlNode::from_start(&e));
            }
            Ok(Event::Empty(e)) => {
                attach(XmlNode::from_start(&e), &mut stack, &mut root)?;
            }
            Ok(Event::End(_)) => {
                let node = stack
                    .pop()
                    .ok_or_else(|| ParseError::Syntax("unexpected closing tag".to_string()))?;
                attach(node, &mut stack, &mut root)?;
            }
            Ok(Event::Text(e)) => {
                let text = e
                    .unescape()
                    .map_err(|err| syntax_error(&reader, err))?;
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&text);
                }
            }
            Ok(Event::CData(e)) => {
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&String::from_utf8_lossy(&e));
                }
            }
            Ok(Event::Eof) => break,
            // 声明、注释、处理指令、DOCTYPE 忽略
            Ok(_) => {}
            Err(err) => return Err(syntax_error(&reader, err)),
        }
    }

    if let Some(open) = stack.first() {
        return Err(ParseError::Unclosed(open.name.clone()));
    }
    root.ok_or(ParseError::NoRoot)
}

fn attach(
    node: XmlNode,
    stack: &mut [XmlNode],
    root: &mut Option<XmlNode>,
) -> Result<(), ParseError> {
    match stack.last_mut() {
        Some(parent) => {
            parent.children.push(node);
            Ok(())
        }
        None if root.is_some() => Err(ParseError::MultipleRoots),
        None => {
            *root = Some(node);
            Ok(())
        }
    }
}

fn syntax_error(reader: &Reader<&[u8]>, err: quick_xml::Error) -> ParseError {
    ParseError::Syntax(format!("at byte {}: {}", reader.error_position(), err))
}
