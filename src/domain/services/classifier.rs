// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use regex::{Regex, RegexBuilder};

use crate::utils::url_utils::host_key;

/// 分类器结论
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifierVerdict {
    /// 是否为软404（状态码正常但内容显示“不存在”）
    pub is_fake_not_found: bool,
    /// 判定原因
    pub reason: String,
}

impl ClassifierVerdict {
    pub fn not_found(reason: impl Into<String>) -> Self {
        Self {
            is_fake_not_found: true,
            reason: reason.into(),
        }
    }

    pub fn exists() -> Self {
        Self {
            is_fake_not_found: false,
            reason: String::new(),
        }
    }
}

/// 软404分类器特质
pub trait Classifier: Send + Sync {
    /// 根据URL、正文文本和标题判断页面是否为软404
    fn classify(&self, url: &str, body_text: &str, title: &str) -> ClassifierVerdict;
}

/// 规则匹配的位置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchTarget {
    Title,
    Body,
}

/// 单条软404规则
#[derive(Debug, Clone)]
pub struct SoftNotFoundRule {
    /// 适用的主机后缀，为空表示适用于所有主机
    hosts: Vec<String>,
    target: MatchTarget,
    pattern: Regex,
    reason: String,
}

impl SoftNotFoundRule {
    /// 创建规则，模式按大小写不敏感编译
    pub fn new(
        hosts: &[&str],
        target: MatchTarget,
        pattern: &str,
        reason: impl Into<String>,
    ) -> Result<Self, regex::Error> {
        Ok(Self {
            hosts: hosts.iter().map(|h| h.to_string()).collect(),
            target,
            pattern: RegexBuilder::new(pattern).case_insensitive(true).build()?,
            reason: reason.into(),
        })
    }

    fn applies_to(&self, host: &str) -> bool {
        self.hosts.is_empty()
            || self
                .hosts
                .iter()
                .any(|h| host == h || host.ends_with(&format!(".{}", h)))
    }

    fn matches(&self, host: &str, body_text: &str, title: &str) -> bool {
        if !self.applies_to(host) {
            return false;
        }
        match self.target {
            MatchTarget::Title => self.pattern.is_match(title),
            MatchTarget::Body => self.pattern.is_match(body_text),
        }
    }
}

/// 基于正则规则的软404分类器
///
/// 站点专用规则优先于通用规则，第一条命中的规则决定原因。
#[derive(Debug, Clone)]
pub struct PatternClassifier {
    rules: Vec<SoftNotFoundRule>,
}

impl PatternClassifier {
    /// 使用内置规则创建分类器
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self::with_rules(builtin_rules()?))
    }

    /// 使用自定义规则创建分类器
    pub fn with_rules(rules: Vec<SoftNotFoundRule>) -> Self {
        Self { rules }
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }
}

impl Classifier for PatternClassifier {
    fn classify(&self, url: &str, body_text: &str, title: &str) -> ClassifierVerdict {
        let host = host_key(url);
        self.rules
            .iter()
            .find(|rule| rule.matches(&host, body_text, title))
            .map(|rule| ClassifierVerdict::not_found(rule.reason.clone()))
            .unwrap_or_else(ClassifierVerdict::exists)
    }
}

fn builtin_rules() -> Result<Vec<SoftNotFoundRule>, regex::Error> {
    use MatchTarget::{Body, Title};

    Ok(vec![
        SoftNotFoundRule::new(
            &["twitter.com", "x.com"],
            Body,
            r"this (post|tweet) (is unavailable|has been deleted|is from a suspended account)|hmm\.\.\.\s*this page doesn['’]t exist|this account doesn['’]t exist|account suspended",
            "Twitter/X: content unavailable",
        )?,
        SoftNotFoundRule::new(
            &["instagram.com"],
            Body,
            r"sorry, this page isn['’]t available|the link you followed may be broken",
            "Instagram: page isn't available",
        )?,
        SoftNotFoundRule::new(
            &["facebook.com", "fb.com", "fb.watch"],
            Body,
            r"this content isn['’]t available|this page isn['’]t available|the link you followed may be broken",
            "Facebook: content isn't available",
        )?,
        SoftNotFoundRule::new(
            &["youtube.com", "youtu.be"],
            Body,
            r"video unavailable|this video isn['’]t available|this video has been removed|this channel (does not|doesn['’]t) exist|this account has been terminated",
            "YouTube: video unavailable",
        )?,
        SoftNotFoundRule::new(
            &["tiktok.com"],
            Body,
            r"couldn['’]t find this (account|video)|video (is |currently )?unavailable",
            "TikTok: content unavailable",
        )?,
        SoftNotFoundRule::new(
            &["reddit.com"],
            Body,
            r"sorry, nobody on reddit goes by that name|there doesn['’]t seem to be anything here|this community (has been banned|doesn['’]t exist)|\[deleted by user\]",
            "Reddit: content removed",
        )?,
        SoftNotFoundRule::new(
            &["linkedin.com"],
            Body,
            r"this page doesn['’]t exist|profile (is )?not found",
            "LinkedIn: page doesn't exist",
        )?,
        SoftNotFoundRule::new(
            &[],
            Title,
            r"\b404\b|page not found|not found|page (does not|doesn['’]t) exist|page (is )?unavailable",
            "Soft 404: not-found title",
        )?,
        SoftNotFoundRule::new(
            &[],
            Body,
            r"the page you (requested|were looking for|are looking for) (could not|cannot|can['’]t) be found|this page (no longer exists|has been removed|has been deleted)",
            "Soft 404: not-found message",
        )?,
    ])
}
