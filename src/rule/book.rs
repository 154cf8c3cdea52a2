//! 规则簿：规则编辑器对规则存储的数据操作（不含任何界面逻辑）
//! 每次修改都整体写回规则存储，由变更通知驱动缓存重新编译

use std::sync::Arc;
use chrono::Local;
use tracing::info;

use super::model::{FileTypes, RawRule, RuleId};
use crate::activity::Suggestion;
use crate::compiler::RuleCompiler;
use crate::error::{RouterError, RouterResult};
use crate::router::{DownloadEvent, MatchOutcome, RuleEngine};
use crate::store::RuleStore;

/// 规则试匹配结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchPreview {
    pub rule_id: RuleId,
    pub path: String,
}

/// 规则簿
pub struct RuleBook {
    store: Arc<dyn RuleStore>,
    rules: Vec<RawRule>,
}

impl RuleBook {
    /// 从存储加载并补全默认值，按优先级降序排列
    pub async fn load(store: Arc<dyn RuleStore>) -> RouterResult<Self> {
        let values = store.load_rules().await?;
        let mut rules: Vec<RawRule> = RawRule::from_values(&values)
            .into_iter()
            .map(Self::with_defaults)
            .collect();
        rules.sort_by(|a, b| b.priority.unwrap_or(0).cmp(&a.priority.unwrap_or(0)));
        Ok(Self { store, rules })
    }

    fn with_defaults(mut rule: RawRule) -> RawRule {
        if rule.id.is_none() {
            rule.id = Some(RuleId::Text(RuleCompiler::next_id().to_string()));
        }
        rule.match_type.get_or_insert_with(|| "includes".to_string());
        rule.target_type.get_or_insert_with(|| "fileUrl".to_string());
        rule.priority.get_or_insert(0);
        rule.enabled.get_or_insert(true);
        rule.file_types = Some(FileTypes::List(
            rule.file_types.as_ref().map(FileTypes::normalized).unwrap_or_default(),
        ));
        rule
    }

    pub fn rules(&self) -> &[RawRule] {
        &self.rules
    }

    pub fn get(&self, id: &str) -> Option<&RawRule> {
        self.rules.iter().find(|r| Self::has_id(r, id))
    }

    fn has_id(rule: &RawRule, id: &str) -> bool {
        rule.id.as_ref().is_some_and(|rid| rid.matches_str(id))
    }

    fn position(&self, id: &str) -> RouterResult<usize> {
        self.rules
            .iter()
            .position(|r| Self::has_id(r, id))
            .ok_or_else(|| RouterError::RuleNotFound(id.to_string()))
    }

    /// 新增规则：校验正则，分配新ID；未给出优先级时取现有最大值 + 1
    pub async fn add(&mut self, raw: RawRule) -> RouterResult<RuleId> {
        RuleCompiler::validate(&raw)?;

        let priority = raw.priority.unwrap_or_else(|| {
            self.rules
                .iter()
                .map(|r| r.priority.unwrap_or(0))
                .max()
                .map_or(0, |max| max + 1)
        });
        let id = RuleId::Text(RuleCompiler::next_id().to_string());
        let rule = Self::with_defaults(RawRule {
            id: Some(id.clone()),
            priority: Some(priority),
            enabled: Some(true),
            ..raw
        });

        let mut updated = self.rules.clone();
        updated.push(rule);
        self.save(updated).await?;
        info!("Rule {} added", id);
        Ok(id)
    }

    /// 更新规则：合并给出的字段，保留ID；未给出优先级时保留原值
    pub async fn update(&mut self, id: &str, patch: RawRule) -> RouterResult<()> {
        let index = self.position(id)?;
        let mut merged = self.rules[index].clone();

        macro_rules! merge {
            ($($field:ident),*) => {
                $(if patch.$field.is_some() { merged.$field = patch.$field.clone(); })*
            };
        }
        merge!(site_pattern, match_type, target_type, folder_name, file_types, priority, enabled);
        merged.extra.extend(patch.extra.clone());

        RuleCompiler::validate(&merged)?;

        let mut updated = self.rules.clone();
        updated[index] = Self::with_defaults(merged);
        self.save(updated).await
    }

    pub async fn delete(&mut self, id: &str) -> RouterResult<()> {
        let index = self.position(id)?;
        let mut updated = self.rules.clone();
        updated.remove(index);
        self.save(updated).await
    }

    pub async fn toggle(&mut self, id: &str, enabled: bool) -> RouterResult<()> {
        let index = self.position(id)?;
        let mut updated = self.rules.clone();
        updated[index].enabled = Some(enabled);
        self.save(updated).await
    }

    /// 移动规则并重新计算优先级（越靠前优先级越高，末尾为 0）
    pub async fn reorder(&mut self, from: usize, to: usize) -> RouterResult<()> {
        let len = self.rules.len();
        if from >= len {
            return Err(RouterError::RuleIndexOutOfRange { index: from, len });
        }
        if to >= len {
            return Err(RouterError::RuleIndexOutOfRange { index: to, len });
        }

        let mut updated = self.rules.clone();
        let moved = updated.remove(from);
        updated.insert(to, moved);

        let total = updated.len() as i64;
        for (index, rule) in updated.iter_mut().enumerate() {
            rule.priority = Some(total - 1 - index as i64);
        }
        self.save(updated).await
    }

    /// 采纳分析器给出的建议
    pub async fn apply_suggestion(&mut self, suggestion: &Suggestion) -> RouterResult<RuleId> {
        self.add(suggestion.rule_data.clone()).await
    }

    /// 试匹配：返回将会命中的规则和目标路径，不写日志
    pub fn test_match(&self, event: &DownloadEvent) -> Option<MatchPreview> {
        let compiled = RuleCompiler::compile(&self.rules);
        RuleEngine::evaluate(event, &compiled, Local::now().date_naive()).map(
            |MatchOutcome { rule, decision }| MatchPreview {
                rule_id: rule.id.clone(),
                path: decision.path,
            },
        )
    }

    async fn save(&mut self, updated: Vec<RawRule>) -> RouterResult<()> {
        self.store.save_rules(&updated).await?;
        self.rules = updated;
        Ok(())
    }
}
