//! 打印任务类型
//!
//! 核心只负责组装打印内容，真正的打印驱动在外部。

use crate::cashier::SessionSummary;
use serde::{Deserialize, Serialize};
use shared::models::{AccountPayment, OrderItem, RoomCharge};

/// 80mm 纸宽对应的字符数
pub const DEFAULT_WIDTH: usize = 48;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrintKind {
    /// 结账小票
    Receipt,
    /// 挂房账单
    RoomCharge,
    /// 交班报表
    ClosingReport,
}

/// 一行：左侧文字 + 可选右对齐金额
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrintLine {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
}

impl PrintLine {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            amount: None,
        }
    }

    pub fn amount(text: impl Into<String>, amount: f64) -> Self {
        Self {
            text: text.into(),
            amount: Some(amount),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrintJob {
    pub kind: PrintKind,
    pub title: String,
    pub lines: Vec<PrintLine>,
    pub total: f64,
    pub user: String,
    pub created_at: String,
}

fn item_lines(items: &[OrderItem]) -> Vec<PrintLine> {
    items
        .iter()
        .map(|item| {
            PrintLine::amount(
                format!("{} x {}", item.qty, item.name),
                crate::money::to_f64(crate::money::line_total(item)),
            )
        })
        .collect()
}

impl PrintJob {
    /// 餐桌结账小票
    pub fn table_receipt(
        table_id: &str,
        items: &[OrderItem],
        payments: &[AccountPayment],
        total: f64,
        user: &str,
    ) -> Self {
        let mut lines = item_lines(items);
        lines.push(PrintLine::text("-"));
        lines.extend(payments.iter().map(|p| PrintLine::amount(&p.method, p.amount)));
        Self {
            kind: PrintKind::Receipt,
            title: format!("Mesa {}", table_id),
            lines,
            total,
            user: user.to_string(),
            created_at: shared::util::human_now(),
        }
    }

    /// 挂房账单（每个新挂账一张）
    pub fn room_charge(charge: &RoomCharge, user: &str) -> Self {
        let mut lines = item_lines(&charge.items);
        if charge.service_fee > 0.0 {
            lines.push(PrintLine::amount("Taxa de serviço", charge.service_fee));
        }
        if charge.discount > 0.0 {
            lines.push(PrintLine::amount("Desconto", -charge.discount));
        }
        Self {
            kind: PrintKind::RoomCharge,
            title: format!("Quarto {}", charge.room_number),
            lines,
            total: charge.total,
            user: user.to_string(),
            created_at: shared::util::human_now(),
        }
    }

    /// 交班报表
    pub fn closing_report(summary: &SessionSummary, user: &str) -> Self {
        let mut lines = vec![
            PrintLine::amount("Saldo inicial", summary.opening_balance),
            PrintLine::amount("Entradas", summary.total_in),
            PrintLine::amount("Saídas", -summary.total_out),
        ];
        lines.extend(
            summary
                .by_method
                .iter()
                .map(|(method, amount)| PrintLine::amount(method, *amount)),
        );
        lines.push(PrintLine::amount("Dinheiro em caixa", summary.cash_balance));
        Self {
            kind: PrintKind::ClosingReport,
            title: format!("Fechamento {}", summary.cashier_type.display_name()),
            lines,
            total: summary.total_balance,
            user: user.to_string(),
            created_at: shared::util::human_now(),
        }
    }

    /// 纯文本渲染，金额右对齐
    pub fn render_text(&self, width: usize) -> String {
        let rule = "=".repeat(width);
        let mut out = Vec::with_capacity(self.lines.len() + 6);
        out.push(rule.clone());
        out.push(format!("{:^width$}", self.title, width = width));
        out.push(rule.clone());
        for line in &self.lines {
            match line.amount {
                _ if line.text == "-" => out.push("-".repeat(width)),
                Some(amount) => out.push(two_columns(&line.text, &format!("{:.2}", amount), width)),
                None => out.push(line.text.clone()),
            }
        }
        out.push(rule);
        out.push(two_columns("TOTAL", &format!("{:.2}", self.total), width));
        out.push(format!("{} - {}", self.created_at, self.user));
        out.join("\n")
    }
}

fn two_columns(left: &str, right: &str, width: usize) -> String {
    let used = left.chars().count() + right.chars().count();
    if used >= width {
        return format!("{} {}", left, right);
    }
    format!("{}{}{}", left, " ".repeat(width - used), right)
}
