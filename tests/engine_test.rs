//! 执行引擎集成测试：fail-fast、步数上限、空计划、上下文传递

mod common;

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use agentic::config::AgentSection;
    use agentic::dispatcher::Dispatcher;
    use agentic::llm::MockLlmClient;
    use agentic::react::{
        AgentContext, ExecutionEngine, KeywordPlanner, LlmPlanner, Planner, StaticPlanner, Step,
    };
    use agentic::tools::CalculatorTool;
    use agentic::{AgentError, DispatchError};
    use serde_json::json;
    use uuid::Uuid;

    use crate::common::{Behavior, ScriptedTool};

    fn engine(dispatcher: &Arc<Dispatcher>, planner: impl Planner + 'static) -> ExecutionEngine {
        ExecutionEngine::new(AgentSection::default(), dispatcher.clone(), Arc::new(planner))
    }

    async fn register(dispatcher: &Dispatcher, tool: ScriptedTool) -> Arc<ScriptedTool> {
        let tool = Arc::new(tool);
        dispatcher.register_arc(tool.clone()).await.unwrap();
        tool
    }

    fn step(tool: &str, n: usize) -> Step {
        Step::new(tool, json!({}), format!("step {}", n))
    }

    #[tokio::test]
    async fn test_fail_fast_stops_after_first_failure() {
        let dispatcher = Arc::new(Dispatcher::default());
        let a = register(&dispatcher, ScriptedTool::new("a", "1.0.0")).await;
        let b = register(
            &dispatcher,
            ScriptedTool::new("b", "1.0.0").behavior(Behavior::Fail("disk full".into())),
        )
        .await;
        let c = register(&dispatcher, ScriptedTool::new("c", "1.0.0")).await;

        let planner = StaticPlanner::new(vec![step("a", 1), step("b", 2), step("c", 3)]);
        let run = engine(&dispatcher, planner)
            .execute("do three things", None, None)
            .await
            .unwrap();

        assert!(!run.success);
        assert_eq!(run.tools_invoked, vec!["a", "b"]);
        assert_eq!(run.error.as_deref(), Some("Step 2 failed: disk full"));
        assert_eq!(run.failed_step, Some(2));
        assert_eq!(run.iterations, 2);
        assert_eq!(run.outputs.len(), 1);
        assert!(run.output.starts_with("Step 1 (step 1):"));
        assert_eq!(a.call_count(), 1);
        assert_eq!(b.call_count(), 1);
        assert_eq!(c.call_count(), 0);
    }

    #[tokio::test]
    async fn test_max_iterations_bounds_attempted_steps() {
        let dispatcher = Arc::new(Dispatcher::default());
        let echo = register(&dispatcher, ScriptedTool::new("echo", "1.0.0")).await;
        let planner = StaticPlanner::new((1..=5).map(|n| step("echo", n)).collect::<Vec<_>>());
        let engine = engine(&dispatcher, planner);

        let run = engine.execute("repeat", None, Some(2)).await.unwrap();
        assert!(run.success);
        assert_eq!(run.iterations, 2);
        assert_eq!(run.tools_invoked.len(), 2);
        assert_eq!(run.output.lines().count(), 2);
        assert_eq!(echo.call_count(), 2);

        let run = engine.execute("repeat", None, None).await.unwrap();
        assert_eq!(run.iterations, 5);
        assert_eq!(engine.iteration_count(), 7);

        engine.reset();
        assert_eq!(engine.iteration_count(), 0);
    }

    #[tokio::test]
    async fn test_zero_max_iterations_attempts_nothing() {
        let dispatcher = Arc::new(Dispatcher::default());
        let echo = register(&dispatcher, ScriptedTool::new("echo", "1.0.0")).await;
        let run = engine(&dispatcher, StaticPlanner::new(vec![step("echo", 1)]))
            .execute("nothing", None, Some(0))
            .await
            .unwrap();
        assert!(run.success);
        assert_eq!(run.iterations, 0);
        assert_eq!(echo.call_count(), 0);
    }

    #[tokio::test]
    async fn test_empty_plan_fails_without_invoking() {
        let dispatcher = Arc::new(Dispatcher::default());
        let echo = register(&dispatcher, ScriptedTool::new("echo", "1.0.0")).await;
        let run = engine(&dispatcher, StaticPlanner::default())
            .execute("write a poem", None, None)
            .await
            .unwrap();

        assert!(!run.success);
        assert_eq!(run.iterations, 0);
        assert!(run.tools_invoked.is_empty());
        assert_eq!(run.error, Some(AgentError::PlanningEmpty.to_string()));
        assert_eq!(echo.call_count(), 0);
    }

    #[tokio::test]
    async fn test_unknown_tool_propagates_not_found() {
        let dispatcher = Arc::new(Dispatcher::default());
        let err = engine(&dispatcher, StaticPlanner::new(vec![step("ghost", 1)]))
            .execute("haunt", None, None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            AgentError::Dispatch(DispatchError::ToolNotFound(name)) if name == "ghost"
        ));
    }

    #[tokio::test]
    async fn test_keyword_planner_end_to_end() {
        let dispatcher = Arc::new(Dispatcher::default());
        dispatcher.register(CalculatorTool::new()).await.unwrap();

        let run = engine(&dispatcher, KeywordPlanner::new())
            .execute("Add 10 and 5", None, None)
            .await
            .unwrap();
        assert!(run.success, "{:?}", run.error);
        assert_eq!(run.tools_invoked, vec!["calculator"]);
        assert_eq!(run.outputs[0]["result"], 15.0);
        assert!(run.output.starts_with("Step 1 (add 10 and 5):"));
        assert_eq!(run.task, "Add 10 and 5");
    }

    #[tokio::test]
    async fn test_context_propagates_to_each_step() {
        let dispatcher = Arc::new(Dispatcher::default());
        let recorder = register(&dispatcher, ScriptedTool::new("recorder", "1.0.0")).await;
        let plan = vec![step("recorder", 1), step("recorder", 2)];
        let engine = engine(&dispatcher, StaticPlanner::new(plan));

        let ctx = AgentContext::new(engine.agent_id()).with_user("alice");
        let run = engine.execute("trace me", Some(ctx.clone()), None).await.unwrap();
        assert!(run.success);
        assert_eq!(run.session_id, ctx.session_id);

        let seen = recorder.contexts();
        assert_eq!(seen.len(), 2);
        for (i, exec) in seen.iter().enumerate() {
            assert_eq!(exec.agent_id, engine.agent_id());
            assert_eq!(exec.session_id, ctx.session_id);
            assert_eq!(exec.trace_id, ctx.trace_id);
            assert_eq!(exec.user_id.as_deref(), Some("alice"));
            assert_eq!(exec.span_id, format!("span-{}", i));
        }
        assert_ne!(seen[0].execution_id, seen[1].execution_id);
    }

    #[tokio::test]
    async fn test_synthesized_context_when_absent() {
        let dispatcher = Arc::new(Dispatcher::default());
        let recorder = register(&dispatcher, ScriptedTool::new("recorder", "1.0.0")).await;
        let engine = engine(&dispatcher, StaticPlanner::new(vec![step("recorder", 1)]));

        let first = engine.execute("x", None, None).await.unwrap();
        let second = engine.execute("x", None, None).await.unwrap();
        assert_ne!(first.session_id, second.session_id);
        assert_ne!(first.session_id, Uuid::nil());
        assert!(recorder.contexts()[0].trace_id.starts_with("trace-"));
    }

    #[tokio::test]
    async fn test_planner_error_reported_in_result() {
        let dispatcher = Arc::new(Dispatcher::default());
        dispatcher.register(CalculatorTool::new()).await.unwrap();
        let llm = Arc::new(MockLlmClient::new(["I would rather not."]));

        let run = engine(&dispatcher, LlmPlanner::new(llm))
            .execute("Add 1 and 2", None, None)
            .await
            .unwrap();
        assert!(!run.success);
        assert!(run.error.unwrap().starts_with("Planning failed:"));
        assert_eq!(run.iterations, 0);
    }
}
