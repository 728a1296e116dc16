//! 执行引擎：规划 → 逐步调用 → 汇总
//!
//! 每次 execute 向 Planner 要一份计划，按顺序经 Dispatcher 调用每一步；
//! 任一步失败立即停止（fail-fast），max_iterations 严格限制尝试的步数。
//! 工具失败不重试，只记录在 RunResult 中；ToolNotFound 作为 Err 向上传播。

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tokio::time::Instant;
use uuid::Uuid;

use crate::config::AgentSection;
use crate::core::AgentError;
use crate::dispatcher::{Dispatcher, LATEST};
use crate::react::planner::{Plan, Planner};
use crate::tools::ExecutionContext;

/// 一次运行的关联信息；缺省时由引擎生成
#[derive(Debug, Clone)]
pub struct AgentContext {
    pub agent_id: Uuid,
    pub session_id: Uuid,
    pub user_id: Option<String>,
    pub trace_id: String,
    pub parent_span_id: Option<String>,
}

impl AgentContext {
    pub fn new(agent_id: Uuid) -> Self {
        Self {
            agent_id,
            session_id: Uuid::new_v4(),
            user_id: None,
            trace_id: format!("trace-{}", Uuid::new_v4()),
            parent_span_id: None,
        }
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }
}

/// 一次 execute 的汇总结果
#[derive(Debug, Clone, Serialize)]
pub struct RunResult {
    pub agent_id: Uuid,
    pub session_id: Uuid,
    pub task: String,
    /// 每步一行：`Step n (description): output`
    pub output: String,
    pub outputs: Vec<Value>,
    pub success: bool,
    /// 本次运行实际尝试的步数
    pub iterations: usize,
    pub tools_invoked: Vec<String>,
    pub duration: Duration,
    pub error: Option<String>,
    /// 第一个失败步骤的序号（从 1 开始）
    pub failed_step: Option<usize>,
}

impl RunResult {
    fn started(ctx: &AgentContext, task: &str) -> Self {
        Self {
            agent_id: ctx.agent_id,
            session_id: ctx.session_id,
            task: task.to_string(),
            output: String::new(),
            outputs: Vec::new(),
            success: true,
            iterations: 0,
            tools_invoked: Vec::new(),
            duration: Duration::ZERO,
            error: None,
            failed_step: None,
        }
    }

    fn fail(mut self, error: impl Into<String>, started: Instant) -> Self {
        self.success = false;
        self.error = Some(error.into());
        self.duration = started.elapsed();
        self
    }

    pub fn duration_secs(&self) -> f64 {
        self.duration.as_secs_f64()
    }
}

pub struct ExecutionEngine {
    agent_id: Uuid,
    name: String,
    max_iterations: usize,
    dispatcher: Arc<Dispatcher>,
    planner: Arc<dyn Planner>,
    iteration_count: AtomicUsize,
}

impl ExecutionEngine {
    pub fn new(config: AgentSection, dispatcher: Arc<Dispatcher>, planner: Arc<dyn Planner>) -> Self {
        let agent_id = Uuid::new_v4();
        tracing::info!(%agent_id, name = %config.name, "execution engine created");
        Self {
            agent_id,
            name: config.name,
            max_iterations: config.max_iterations,
            dispatcher,
            planner,
            iteration_count: AtomicUsize::new(0),
        }
    }

    pub fn agent_id(&self) -> Uuid {
        self.agent_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    /// 自创建或上次 reset 以来累计尝试的步数
    pub fn iteration_count(&self) -> usize {
        self.iteration_count.load(Ordering::SeqCst)
    }

    /// 用当前工具目录为任务生成计划
    pub async fn plan(&self, task: &str) -> Result<Plan, AgentError> {
        let catalog = self.dispatcher.list(None, &[]).await;
        self.planner.create_plan(task, &catalog).await
    }

    pub async fn execute(
        &self,
        task: &str,
        context: Option<AgentContext>,
        max_iterations: Option<usize>,
    ) -> Result<RunResult, AgentError> {
        let started = Instant::now();
        let ctx = context.unwrap_or_else(|| AgentContext::new(self.agent_id));
        let max_iterations = max_iterations.unwrap_or(self.max_iterations);
        let mut run = RunResult::started(&ctx, task);

        tracing::info!(
            agent_id = %ctx.agent_id,
            session_id = %ctx.session_id,
            trace_id = %ctx.trace_id,
            task,
            "agent execution started"
        );

        let plan = match self.plan(task).await {
            Ok(plan) => plan,
            Err(AgentError::Dispatch(e)) => return Err(e.into()),
            Err(e @ AgentError::Planning(_)) => {
                tracing::error!(error = %e, "planning failed");
                return Ok(run.fail(e.to_string(), started));
            }
            Err(e) => {
                tracing::error!(error = %e, "planning failed");
                return Ok(run.fail(format!("Planning failed: {}", e), started));
            }
        };

        if plan.is_empty() {
            tracing::warn!(task, "no plan created");
            return Ok(run.fail(AgentError::PlanningEmpty.to_string(), started));
        }

        for (i, step) in plan.iter().take(max_iterations).enumerate() {
            let n = i + 1;
            run.iterations = n;
            self.iteration_count.fetch_add(1, Ordering::SeqCst);

            let mut exec_ctx = ExecutionContext::new(
                ctx.agent_id,
                ctx.session_id,
                ctx.trace_id.clone(),
                format!("span-{}", i),
            );
            exec_ctx.user_id = ctx.user_id.clone();

            tracing::debug!(step = n, tool = %step.tool, description = %step.description, "executing step");
            let result = self
                .dispatcher
                .invoke(&step.tool, step.params.clone(), &exec_ctx, LATEST)
                .await?;
            run.tools_invoked.push(step.tool.clone());

            if !result.success {
                let error = result.error.unwrap_or_default();
                tracing::warn!(step = n, tool = %step.tool, error = %error, "step failed");
                run.failed_step = Some(n);
                return Ok(run.fail(format!("Step {} failed: {}", n, error), started));
            }

            run.output.push_str(&format!(
                "Step {} ({}): {}\n",
                n,
                step.description,
                render(&result.output)
            ));
            run.outputs.push(result.output);
        }

        if plan.len() > max_iterations {
            tracing::warn!(planned = plan.len(), max_iterations, "plan truncated by max iterations");
        }

        run.output = run.output.trim_end().to_string();
        run.duration = started.elapsed();
        tracing::info!(
            agent_id = %ctx.agent_id,
            iterations = run.iterations,
            duration_secs = run.duration_secs(),
            "agent execution completed"
        );
        Ok(run)
    }

    pub fn reset(&self) {
        self.iteration_count.store(0, Ordering::SeqCst);
        tracing::info!(agent_id = %self.agent_id, "agent reset");
    }
}

fn render(output: &Value) -> String {
    match output {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
