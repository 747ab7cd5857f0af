#[cfg(test)]
mod tests {
    use crate::error::Result;
    use crate::systemd::cli::MockCommandRunner;
    use crate::systemd::{
        select_source, ActiveState, CliSource, DataSourceKind, PatternSet, Source, UnitCollection,
    };

    const SYSTEM_UNITS: &str = include_str!("../../tests/fixtures/systemctl-list-units_system.txt");
    const USER_UNITS: &str = include_str!("../../tests/fixtures/systemctl-list-units_user.txt");
    const EXCLUDES: &str =
        include_str!("../../tests/fixtures/systemctl-list-units_regexp-excludes.txt");

    fn source_with_units(system: &'static str, user: Option<&'static str>) -> Box<dyn Source> {
        let mut runner = MockCommandRunner::new();
        runner
            .expect_run()
            .withf(|args| args.join(" ") == "systemctl list-units --all")
            .returning(move |_| Ok(Some(system.to_string())));
        if let Some(user) = user {
            runner
                .expect_run()
                .withf(|args| args.join(" ") == "systemctl list-units --all --user")
                .returning(move |_| Ok(Some(user.to_string())));
        }
        Box::new(CliSource::new(runner))
    }

    #[tokio::test]
    async fn test_cached_units_user_scope_overwrites_system_scope() -> Result<()> {
        let source = source_with_units(SYSTEM_UNITS, Some(USER_UNITS));
        let units = source.get_all_units_cached(true).await?;

        assert_eq!(units.count(), 3);
        let dbus = units.get("dbus.service").map(|unit| unit.active_state());
        assert_eq!(dbus, Some(ActiveState::Active));
        let pipewire = units.get("pipewire.service").map(|unit| unit.active_state());
        assert_eq!(pipewire, Some(ActiveState::Failed));

        Ok(())
    }

    #[tokio::test]
    async fn test_cached_units_without_user_scope() -> Result<()> {
        let source = source_with_units(SYSTEM_UNITS, None);
        let units = source.get_all_units_cached(false).await?;
        assert_eq!(units.count(), 2);
        assert!(units.get("pipewire.service").is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_exclude_user_managers() -> Result<()> {
        let source = source_with_units(EXCLUDES, None);
        let units: UnitCollection = source.get_all_units_cached(false).await?;
        let exclude = PatternSet::new([r"user@\d+\.service"])?;

        let remaining: Vec<&str> = units
            .filter(&PatternSet::default(), &exclude)
            .map(|unit| unit.name())
            .collect();
        assert_eq!(remaining, vec!["nginx.service"]);

        let counts = units
            .filtered(&PatternSet::default(), &exclude)
            .count_by_states(&["active_state:failed"])?;
        assert_eq!(counts["active_state:failed"], 0);

        Ok(())
    }

    #[tokio::test]
    async fn test_select_cli_source() {
        let source = select_source(DataSourceKind::Cli).await;
        assert_eq!(source.name(), "cli");
    }

    #[test]
    fn test_data_source_kind_labels() {
        assert_eq!(DataSourceKind::default(), DataSourceKind::Cli);
        assert_eq!(DataSourceKind::Cli.label(), "cli");
        assert_eq!(DataSourceKind::Dbus.label(), "dbus");
    }
}
