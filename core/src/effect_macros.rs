//! Ergonomic macros for building effects inside reducers

/// Create an `Effect::Future` from an async block
///
/// # Example
///
/// ```rust,ignore
/// use tally_core::async_effect;
///
/// async_effect! {
///     let outcome = service.submit(request).await;
///     Some(VoteAction::Submitted { outcome })
/// }
/// ```
#[macro_export]
macro_rules! async_effect {
    ($($body:tt)*) => {
        $crate::effect::Effect::Future(
            ::std::boxed::Box::pin(async move { $($body)* })
        )
    };
}

#[cfg(test)]
mod tests {
    use crate::effect::Effect;

    #[derive(Clone, Debug)]
    enum TestAction {
        Confirmed { value: i32 },
    }

    #[tokio::test]
    async fn test_async_effect_macro() {
        let value = 42;
        let effect = async_effect! {
            Some(TestAction::Confirmed { value })
        };

        let Effect::Future(fut) = effect else {
            unreachable!("async_effect! builds a future effect");
        };
        assert!(matches!(fut.await, Some(TestAction::Confirmed { value: 42 })));
    }
}
