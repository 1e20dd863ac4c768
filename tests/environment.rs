#[cfg(test)]
mod environment_tests {
    use std::rc::Rc;

    use treelox as lox;

    use lox::environment::Environment;
    use lox::token::Token;
    use lox::value::Value;

    fn name(s: &str) -> Token {
        Token::identifier(s, 1)
    }

    #[test]
    fn test_define_get_and_redefine() {
        let mut env = Environment::new();

        env.define("a", Value::Number(1.0));
        assert_eq!(env.get(&name("a")).unwrap(), Value::Number(1.0));

        env.define("a", Value::String("again".into()));
        assert_eq!(env.get(&name("a")).unwrap(), Value::String("again".into()));
    }

    #[test]
    fn test_lookup_walks_the_chain() {
        let globals = Environment::new().shared();
        globals.borrow_mut().define("g", Value::Bool(true));

        let inner = Environment::with_enclosing(Rc::clone(&globals));

        assert_eq!(inner.get(&name("g")).unwrap(), Value::Bool(true));
        assert!(inner.get_local("g").is_none());
    }

    #[test]
    fn test_assign_updates_nearest_binding() {
        let globals = Environment::new().shared();
        globals.borrow_mut().define("x", Value::Number(1.0));

        let mut inner = Environment::with_enclosing(Rc::clone(&globals));
        inner.assign(&name("x"), Value::Number(2.0)).unwrap();

        assert_eq!(globals.borrow().get(&name("x")).unwrap(), Value::Number(2.0));
        assert!(inner.get_local("x").is_none());
    }

    #[test]
    fn test_undefined_names_are_runtime_errors() {
        let mut env = Environment::new();

        let error = env.get(&name("nope")).unwrap_err();
        assert_eq!(error.to_string(), "Undefined variable 'nope'.\n[line 1]");

        let error = env.assign(&name("nope"), Value::Nil).unwrap_err();
        assert_eq!(error.message(), "Undefined variable 'nope'.");
    }

    #[test]
    fn test_distance_addressing() {
        let outer = Environment::new().shared();
        outer.borrow_mut().define("v", Value::Number(1.0));

        let middle = Environment::with_enclosing(Rc::clone(&outer)).shared();
        middle.borrow_mut().define("v", Value::Number(2.0));

        let inner = Environment::with_enclosing(Rc::clone(&middle)).shared();

        assert_eq!(
            Environment::get_at(&inner, 2, &name("v")).unwrap(),
            Value::Number(1.0)
        );
        assert_eq!(
            Environment::get_at(&inner, 1, &name("v")).unwrap(),
            Value::Number(2.0)
        );

        Environment::assign_at(&inner, 2, &name("v"), Value::Number(3.0)).unwrap();
        assert_eq!(outer.borrow().get(&name("v")).unwrap(), Value::Number(3.0));
        assert_eq!(middle.borrow().get(&name("v")).unwrap(), Value::Number(2.0));

        assert!(Rc::ptr_eq(&Environment::ancestor(&inner, 1), &middle));
    }
}
