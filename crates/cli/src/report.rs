#![allow(clippy::format_push_string)]

use edgecal_backtest::{CalibrationPack, FitTermination, RunOutcome};

const RULE: &str = "───────────────────────────────────────────────────────────────\n";
const BANNER: &str = "═══════════════════════════════════════════════════════════════\n";

pub struct ReportFormatter;

impl ReportFormatter {
    /// Pack summary plus fit diagnostics from the run.
    #[must_use]
    pub fn format_run(outcome: &RunOutcome) -> String {
        let mut output = Self::format_pack(&outcome.pack);

        output.push_str("Fits\n");
        output.push_str(RULE);
        for (scope, report) in &outcome.fit_reports {
            let status = match report.termination {
                FitTermination::Converged => "converged",
                FitTermination::IterationBudget => "iteration budget",
                FitTermination::SingularHessian => "singular hessian",
                FitTermination::Degenerate => "identity",
            };
            output.push_str(&format!(
                "{:<28} n={:<6} iters={:<4} {}\n",
                scope.to_string(),
                report.samples,
                report.iterations,
                status
            ));
        }
        output.push('\n');
        output
    }

    #[must_use]
    pub fn format_pack(pack: &CalibrationPack) -> String {
        let mut output = String::new();

        output.push('\n');
        output.push_str(BANNER);
        output.push_str(&format!(
            "               CALIBRATION PACK {} {}\n",
            pack.league.to_uppercase(),
            pack.version
        ));
        output.push_str(BANNER);
        output.push('\n');

        output.push_str("Periods\n");
        output.push_str(RULE);
        output.push_str(&format!(
            "Backtest:              {} to {}\n",
            pack.backtest_period.start, pack.backtest_period.end
        ));
        output.push_str(&format!(
            "Train:                 {} to {}\n",
            pack.train_period.start, pack.train_period.end
        ));
        output.push_str(&format!(
            "Test:                  {} to {}\n",
            pack.test_period.start, pack.test_period.end
        ));
        output.push_str(&format!(
            "Generated:             {}\n",
            pack.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
        ));
        output.push('\n');

        output.push_str("Test Performance\n");
        output.push_str(RULE);
        let m = &pack.metrics;
        output.push_str(&format!("Bets:                  {}\n", m.total_bets));
        output.push_str(&format!(
            "Won / Lost / Push:     {} / {} / {}\n",
            m.winning_bets, m.losing_bets, m.push_bets
        ));
        output.push_str(&format!("Hit Rate:              {:.2}%\n", m.hit_rate * 100.0));
        output.push_str(&format!("ROI:                   {:.2}%\n", m.roi * 100.0));
        output.push_str(&format!(
            "Staked / Profit:       {:.2} / {:.2}\n",
            m.total_staked,
            m.total_profit.round_dp(2)
        ));
        output.push_str(&format!("Sharpe (per bet):      {:.4}\n", m.sharpe));
        output.push_str(&format!("Max Drawdown:          {:.2}%\n", m.max_drawdown * 100.0));
        output.push_str(&format!("Brier Score:           {:.4}\n", m.brier_score));
        output.push_str(&format!("Log Loss:              {:.4}\n", m.log_loss));
        output.push('\n');

        output.push_str("Edge Thresholds\n");
        output.push_str(RULE);
        if pack.edge_thresholds.is_empty() {
            output.push_str("(none recommended)\n");
        }
        for (category, threshold) in &pack.edge_thresholds {
            output.push_str(&format!("{category:<22} {threshold:.1}%\n"));
        }
        output.push('\n');

        output.push_str("Probability Transforms\n");
        output.push_str(RULE);
        for (scope, c) in &pack.probability_transforms {
            let scalar = pack.variance_scalars.get(scope).copied().unwrap_or(1.0);
            output.push_str(&format!(
                "{:<28} a={:>7.4} b={:>7.4} var={:.3}\n",
                scope.to_string(),
                c.a,
                c.b,
                scalar
            ));
        }
        output.push('\n');

        if let Some(d) = &pack.diagnostics {
            output.push_str("Diagnostics\n");
            output.push_str(RULE);
            let rho = d
                .spearman_correlation
                .map_or_else(|| "n/a".to_string(), |r| format!("{r:.4}"));
            output.push_str(&format!("Edge/outcome Spearman: {rho}\n"));
            output.push_str(&format!(
                "Bias:                  {:+.4} ({})\n",
                d.bias,
                d.bias_label.as_str()
            ));
            output.push('\n');
        }

        output.push_str(&format!(
            "Kelly: {:?} x{} (stake {}..{})\n",
            pack.kelly_policy.method,
            pack.kelly_policy.fraction,
            pack.kelly_policy.min_stake,
            pack.kelly_policy.max_stake
        ));
        if m.total_bets == 0 {
            output.push_str("No bets qualified in the test window.\n");
        }
        output.push('\n');

        if !pack.notes.is_empty() {
            output.push_str("Notes\n");
            output.push_str(RULE);
            for note in &pack.notes {
                output.push_str(&format!("- {note}\n"));
            }
        }

        output
    }
}
